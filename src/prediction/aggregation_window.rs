use crate::image_classifier::interface::Sample;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot finalize a window that holds no samples")]
pub struct EmptyWindowError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinningPrediction {
    pub class_name: String,
    pub confidence_percent: u8,
}

impl WinningPrediction {
    pub fn new(class_name: impl Into<String>, confidence_percent: u8) -> Self {
        Self {
            class_name: class_name.into(),
            confidence_percent: confidence_percent.min(100),
        }
    }
}

impl fmt::Display for WinningPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.class_name, self.confidence_percent)
    }
}

/// Rounds a probability scaled to percent, half up, into `0..=100`.
pub fn percent_half_up(scaled: f64) -> u8 {
    if !scaled.is_finite() {
        return 0;
    }
    (scaled + 0.5).floor().clamp(0.0, 100.0) as u8
}

/// Accumulator state drained out of a window by `finalize_and_take`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSnapshot {
    accumulated: Vec<(String, f64)>,
    sample_count: u32,
    window_start: Instant,
}

impl WindowSnapshot {
    #[allow(dead_code)]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }
}

/// Time-boxed accumulator of per-class probability mass.
///
/// Classes keep the order in which they were first seen; that order
/// decides exact ties.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationWindow {
    accumulated: Vec<(String, f64)>,
    sample_count: u32,
    window_start: Instant,
}

impl AggregationWindow {
    pub fn new(now: Instant) -> Self {
        Self {
            accumulated: Vec::new(),
            sample_count: 0,
            window_start: now,
        }
    }

    #[allow(dead_code)]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    #[allow(dead_code)]
    pub fn window_start(&self) -> Instant {
        self.window_start
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    /// Adds one classifier frame. Probabilities are clamped to `[0, 1]`
    /// (NaN counts as 0) and a class repeated within the batch is counted
    /// once, first entry wins. An empty batch is not a frame.
    pub fn accumulate(&mut self, batch: &[Sample]) {
        if batch.is_empty() {
            return;
        }

        let mut seen: Vec<&str> = Vec::with_capacity(batch.len());
        for sample in batch {
            if seen.contains(&sample.class_name.as_str()) {
                continue;
            }
            seen.push(sample.class_name.as_str());

            let probability = if sample.probability.is_nan() {
                0.0
            } else {
                f64::from(sample.probability.clamp(0.0, 1.0))
            };
            self.add(&sample.class_name, probability);
        }

        self.sample_count += 1;
    }

    pub fn is_expired(&self, now: Instant, window_duration: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window_duration
    }

    /// Per-class averages in first-seen order.
    #[allow(dead_code)]
    pub fn averages(&self) -> Vec<(String, f64)> {
        if self.sample_count == 0 {
            return Vec::new();
        }
        let count = f64::from(self.sample_count);
        self.accumulated
            .iter()
            .map(|(class_name, sum)| (class_name.clone(), sum / count))
            .collect()
    }

    pub fn winner(&self) -> Result<WinningPrediction, EmptyWindowError> {
        if self.sample_count == 0 {
            return Err(EmptyWindowError);
        }

        let mut best: Option<(&str, f64)> = None;
        for (class_name, sum) in &self.accumulated {
            match best {
                Some((_, best_sum)) if *sum > best_sum => {
                    best = Some((class_name.as_str(), *sum))
                }
                None => best = Some((class_name.as_str(), *sum)),
                _ => {}
            }
        }

        let (class_name, sum) = best.ok_or(EmptyWindowError)?;
        let scaled = 100.0 * sum / f64::from(self.sample_count);
        Ok(WinningPrediction::new(class_name, percent_half_up(scaled)))
    }

    #[allow(dead_code)]
    pub fn finalize_and_reset(
        &mut self,
        now: Instant,
    ) -> Result<WinningPrediction, EmptyWindowError> {
        self.finalize_and_take(now).map(|(prediction, _)| prediction)
    }

    /// Like `finalize_and_reset`, also handing back the drained state so a
    /// failed delivery can put it back with `restore`.
    pub fn finalize_and_take(
        &mut self,
        now: Instant,
    ) -> Result<(WinningPrediction, WindowSnapshot), EmptyWindowError> {
        let prediction = self.winner()?;
        let snapshot = WindowSnapshot {
            accumulated: std::mem::take(&mut self.accumulated),
            sample_count: self.sample_count,
            window_start: self.window_start,
        };
        self.sample_count = 0;
        self.window_start = now;
        Ok((prediction, snapshot))
    }

    /// Merges a drained snapshot back in front of whatever accumulated
    /// since, and rewinds the window clock to the snapshot's start.
    pub fn restore(&mut self, snapshot: WindowSnapshot) {
        let newer = std::mem::replace(&mut self.accumulated, snapshot.accumulated);
        for (class_name, sum) in newer {
            self.add(&class_name, sum);
        }
        self.sample_count += snapshot.sample_count;
        self.window_start = self.window_start.min(snapshot.window_start);
    }

    fn add(&mut self, class_name: &str, probability: f64) {
        match self
            .accumulated
            .iter()
            .position(|(existing, _)| existing == class_name)
        {
            Some(index) => self.accumulated[index].1 += probability,
            None => self.accumulated.push((class_name.to_string(), probability)),
        }
    }
}
