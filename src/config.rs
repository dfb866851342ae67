use crate::model_source::source::TEACHABLE_MACHINE_HOST;
use crate::prediction::delivery_throttle::{AggregationPolicy, FailurePolicy, ThrottleConfig};
use chrono::{Offset, Utc};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_THRESHOLD: f32 = 0.85;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{key} must be {expected}, got `{value}`")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub expected: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayKind {
    Console,
    Gui,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub tick_rate: Duration,
    pub frame_interval: Duration,
    pub window_duration: Duration,
    pub send_timeout: Duration,
    pub aggregation_policy: AggregationPolicy,
    pub failure_policy: FailurePolicy,
    /// Starts the session right away when set.
    pub model_url: Option<String>,
    pub allowed_model_hosts: Vec<String>,
    pub metadata_timeout: Duration,
    pub link_device_dir: PathBuf,
    pub link_name_prefixes: Vec<String>,
    pub link_baud_rate: u32,
    pub display_kind: DisplayKind,
    pub logger_timezone: chrono::FixedOffset,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_rate: Duration::from_millis(100),
            frame_interval: Duration::from_millis(33),
            window_duration: Duration::from_millis(350),
            send_timeout: Duration::from_secs(2),
            aggregation_policy: AggregationPolicy::TimeWindowAverage,
            failure_policy: FailurePolicy::PreserveWindow,
            model_url: None,
            allowed_model_hosts: vec![TEACHABLE_MACHINE_HOST.to_string()],
            metadata_timeout: Duration::from_secs(10),
            link_device_dir: PathBuf::from("/dev/serial/by-id"),
            link_name_prefixes: vec![
                "usb-ARM_BBC_micro:bit".to_string(),
                "usb-Arm_BBC_micro:bit".to_string(),
            ],
            link_baud_rate: 115_200,
            display_kind: DisplayKind::Console,
            logger_timezone: Utc.fix(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Overlays every variable `lookup` knows about. Unset or blank
    /// variables keep the current value.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = get("MODEL_URL") {
            self.model_url = Some(value);
        }
        if let Some(value) = get("ALLOWED_MODEL_HOSTS") {
            self.allowed_model_hosts = list("ALLOWED_MODEL_HOSTS", &value)?;
        }
        if let Some(value) = get("WINDOW_DURATION_MS") {
            self.window_duration = millis("WINDOW_DURATION_MS", &value)?;
        }
        if let Some(value) = get("SEND_TIMEOUT_MS") {
            self.send_timeout = millis("SEND_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = get("FRAME_INTERVAL_MS") {
            self.frame_interval = millis("FRAME_INTERVAL_MS", &value)?;
        }

        let threshold = match get("THRESHOLD") {
            Some(value) => probability("THRESHOLD", &value)?,
            None => DEFAULT_THRESHOLD,
        };
        if let Some(value) = get("AGGREGATION_POLICY") {
            self.aggregation_policy = match value.to_lowercase().as_str() {
                "window" => AggregationPolicy::TimeWindowAverage,
                "threshold" => AggregationPolicy::ThresholdOnChange {
                    min_probability: threshold,
                },
                _ => return Err(invalid("AGGREGATION_POLICY", &value, "`window` or `threshold`")),
            };
        } else if let AggregationPolicy::ThresholdOnChange { .. } = self.aggregation_policy {
            self.aggregation_policy = AggregationPolicy::ThresholdOnChange {
                min_probability: threshold,
            };
        }

        if let Some(value) = get("FAILURE_POLICY") {
            self.failure_policy = match value.to_lowercase().as_str() {
                "preserve" => FailurePolicy::PreserveWindow,
                "discard" => FailurePolicy::DiscardWindow,
                _ => return Err(invalid("FAILURE_POLICY", &value, "`preserve` or `discard`")),
            };
        }

        if let Some(value) = get("LINK_DEVICE_DIR") {
            self.link_device_dir = PathBuf::from(value);
        }
        if let Some(value) = get("LINK_NAME_PREFIXES") {
            self.link_name_prefixes = list("LINK_NAME_PREFIXES", &value)?;
        }
        if let Some(value) = get("LINK_BAUD_RATE") {
            self.link_baud_rate = match value.parse::<u32>() {
                Ok(baud) if baud > 0 => baud,
                _ => return Err(invalid("LINK_BAUD_RATE", &value, "a positive baud rate")),
            };
        }

        if let Some(value) = get("DISPLAY_KIND") {
            self.display_kind = match value.to_lowercase().as_str() {
                "console" => DisplayKind::Console,
                "gui" => DisplayKind::Gui,
                _ => return Err(invalid("DISPLAY_KIND", &value, "`console` or `gui`")),
            };
        }

        if let Some(value) = get("LOG_UTC_OFFSET_HOURS") {
            self.logger_timezone = value
                .parse::<i32>()
                .ok()
                .and_then(|hours| chrono::FixedOffset::east_opt(hours.checked_mul(3600)?))
                .ok_or_else(|| {
                    invalid("LOG_UTC_OFFSET_HOURS", &value, "a whole hour offset from UTC")
                })?;
        }

        Ok(self)
    }

    pub fn throttle(&self) -> ThrottleConfig {
        ThrottleConfig {
            window_duration: self.window_duration,
            send_timeout: self.send_timeout,
            aggregation_policy: self.aggregation_policy,
            failure_policy: self.failure_policy,
        }
    }
}

fn invalid(key: &'static str, value: &str, expected: &'static str) -> ConfigError {
    ConfigError {
        key,
        value: value.to_string(),
        expected,
    }
}

fn millis(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(invalid(key, value, "a positive number of milliseconds")),
    }
}

fn probability(key: &'static str, value: &str) -> Result<f32, ConfigError> {
    match value.parse::<f32>() {
        Ok(p) if (0.0..=1.0).contains(&p) => Ok(p),
        _ => Err(invalid(key, value, "a probability between 0 and 1")),
    }
}

fn list(key: &'static str, value: &str) -> Result<Vec<String>, ConfigError> {
    let items: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() {
        return Err(invalid(key, value, "a comma separated list"));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn with(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::default().with_env(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.window_duration, Duration::from_millis(350));
        assert_eq!(config.send_timeout, Duration::from_secs(2));
        assert_eq!(config.aggregation_policy, AggregationPolicy::TimeWindowAverage);
        assert_eq!(config.failure_policy, FailurePolicy::PreserveWindow);
        assert_eq!(config.model_url, None);
        assert_eq!(config.allowed_model_hosts, vec![TEACHABLE_MACHINE_HOST]);
        assert_eq!(config.link_baud_rate, 115_200);
    }

    #[test]
    fn test_empty_env_keeps_defaults() {
        assert_eq!(with(&[]).unwrap(), Config::default());
        assert_eq!(with(&[("WINDOW_DURATION_MS", "  ")]).unwrap(), Config::default());
    }

    #[test]
    fn test_overrides() {
        let config = with(&[
            ("MODEL_URL", " https://teachablemachine.withgoogle.com/models/abc/ "),
            ("WINDOW_DURATION_MS", "500"),
            ("SEND_TIMEOUT_MS", "1500"),
            ("FAILURE_POLICY", "discard"),
            ("LINK_BAUD_RATE", "9600"),
            ("LINK_DEVICE_DIR", "/tmp/serial"),
            ("LINK_NAME_PREFIXES", "usb-A, usb-B,"),
            ("DISPLAY_KIND", "GUI"),
            ("LOG_UTC_OFFSET_HOURS", "-7"),
        ])
        .unwrap();

        assert_eq!(
            config.model_url.as_deref(),
            Some("https://teachablemachine.withgoogle.com/models/abc/")
        );
        assert_eq!(config.window_duration, Duration::from_millis(500));
        assert_eq!(config.send_timeout, Duration::from_millis(1500));
        assert_eq!(config.failure_policy, FailurePolicy::DiscardWindow);
        assert_eq!(config.link_baud_rate, 9600);
        assert_eq!(config.link_device_dir, PathBuf::from("/tmp/serial"));
        assert_eq!(config.link_name_prefixes, vec!["usb-A", "usb-B"]);
        assert_eq!(config.display_kind, DisplayKind::Gui);
        assert_eq!(config.logger_timezone.local_minus_utc(), -7 * 3600);
    }

    #[test]
    fn test_threshold_policy() {
        let config = with(&[("AGGREGATION_POLICY", "threshold")]).unwrap();
        assert_eq!(
            config.aggregation_policy,
            AggregationPolicy::ThresholdOnChange {
                min_probability: 0.85
            }
        );

        let config = with(&[("AGGREGATION_POLICY", "threshold"), ("THRESHOLD", "0.6")]).unwrap();
        assert_eq!(
            config.aggregation_policy,
            AggregationPolicy::ThresholdOnChange {
                min_probability: 0.6
            }
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let error = with(&[("WINDOW_DURATION_MS", "0")]).unwrap_err();
        assert_eq!(error.key, "WINDOW_DURATION_MS");

        assert!(with(&[("SEND_TIMEOUT_MS", "soon")]).is_err());
        assert!(with(&[("THRESHOLD", "1.5")]).is_err());
        assert!(with(&[("AGGREGATION_POLICY", "median")]).is_err());
        assert!(with(&[("FAILURE_POLICY", "retry")]).is_err());
        assert!(with(&[("LINK_BAUD_RATE", "0")]).is_err());
        assert!(with(&[("LINK_BAUD_RATE", "fast")]).is_err());
        assert!(with(&[("LINK_NAME_PREFIXES", ",,")]).is_err());
        assert!(with(&[("LOG_UTC_OFFSET_HOURS", "30")]).is_err());
    }

    #[test]
    fn test_throttle_config() {
        let config = with(&[("WINDOW_DURATION_MS", "200")]).unwrap();
        let throttle = config.throttle();

        assert_eq!(throttle.window_duration, Duration::from_millis(200));
        assert_eq!(throttle.send_timeout, config.send_timeout);
        assert_eq!(throttle.failure_policy, config.failure_policy);
    }
}
