use crate::device_link::interface::LinkError;
use crate::image_classifier::interface::Sample;
use crate::prediction::aggregation_window::{
    percent_half_up, AggregationWindow, WindowSnapshot, WinningPrediction,
};
use crate::prediction::wire_codec;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregationPolicy {
    /// Average every class over a time window and send the winner.
    TimeWindowAverage,
    /// Send a class as soon as one frame puts it above the threshold,
    /// unless it is the class sent last.
    ThresholdOnChange { min_probability: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Put the undelivered window back; its clock does not advance.
    PreserveWindow,
    /// Drop whatever the failed send carried.
    DiscardWindow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleConfig {
    pub window_duration: Duration,
    pub send_timeout: Duration,
    pub aggregation_policy: AggregationPolicy,
    pub failure_policy: FailurePolicy,
}

/// A frame the caller must hand to the link, then report back with
/// `on_send_done` under the same `send_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub send_id: u64,
    pub prediction: WinningPrediction,
    pub frame: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Delivered { prediction: WinningPrediction },
    NotReady { prediction: WinningPrediction },
    Failed { prediction: WinningPrediction, reason: String },
    TimedOut { prediction: WinningPrediction, after: Duration },
    /// Completion for a send the gate already gave up on.
    Stale { send_id: u64 },
}

#[derive(Debug, Clone, PartialEq)]
struct InFlight {
    send_id: u64,
    started_at: Instant,
    prediction: WinningPrediction,
    snapshot: Option<WindowSnapshot>,
}

/// Single-flight slot guarding the one outbound channel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeliveryGate {
    last_send_time: Option<Instant>,
    in_flight: Option<InFlight>,
    next_send_id: u64,
    /// Set after a timeout or a `Busy` link: the channel may still be
    /// occupied by the abandoned write.
    held_until: Option<Instant>,
}

impl DeliveryGate {
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// No send in flight and no back-off pending at `now`.
    pub fn is_open(&self, now: Instant) -> bool {
        self.in_flight.is_none() && self.held_until.map_or(true, |until| now >= until)
    }

    #[allow(dead_code)]
    pub fn held_until(&self) -> Option<Instant> {
        self.held_until
    }

    fn hold(&mut self, until: Instant) {
        self.held_until = Some(until);
    }

    #[allow(dead_code)]
    pub fn last_send_time(&self) -> Option<Instant> {
        self.last_send_time
    }

    fn acquire(
        &mut self,
        now: Instant,
        prediction: WinningPrediction,
        snapshot: Option<WindowSnapshot>,
    ) -> Option<u64> {
        if !self.is_open(now) {
            return None;
        }
        self.held_until = None;
        self.next_send_id += 1;
        self.in_flight = Some(InFlight {
            send_id: self.next_send_id,
            started_at: now,
            prediction,
            snapshot,
        });
        Some(self.next_send_id)
    }

    fn release(&mut self, send_id: u64) -> Option<InFlight> {
        let matches = self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.send_id == send_id);
        if matches {
            self.in_flight.take()
        } else {
            None
        }
    }

    fn release_if_expired(&mut self, now: Instant, timeout: Duration) -> Option<InFlight> {
        let expired = self.in_flight.as_ref().is_some_and(|in_flight| {
            now.saturating_duration_since(in_flight.started_at) >= timeout
        });
        if expired {
            self.in_flight.take()
        } else {
            None
        }
    }
}

/// Turns the per-frame sample stream into at most one outstanding frame
/// for the peripheral at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryThrottle {
    config: ThrottleConfig,
    window: AggregationWindow,
    gate: DeliveryGate,
    last_dispatched_class: Option<String>,
}

impl DeliveryThrottle {
    pub fn new(config: ThrottleConfig, now: Instant) -> Self {
        Self {
            config,
            window: AggregationWindow::new(now),
            gate: DeliveryGate::default(),
            last_dispatched_class: None,
        }
    }

    #[allow(dead_code)]
    pub fn window(&self) -> &AggregationWindow {
        &self.window
    }

    #[allow(dead_code)]
    pub fn gate(&self) -> &DeliveryGate {
        &self.gate
    }

    #[allow(dead_code)]
    pub fn is_send_in_flight(&self) -> bool {
        self.gate.is_busy()
    }

    pub fn on_frame(&mut self, batch: &[Sample], now: Instant) -> Option<Dispatch> {
        match self.config.aggregation_policy {
            AggregationPolicy::TimeWindowAverage => self.on_frame_windowed(batch, now),
            AggregationPolicy::ThresholdOnChange { min_probability } => {
                self.on_frame_threshold(batch, min_probability, now)
            }
        }
    }

    fn on_frame_windowed(&mut self, batch: &[Sample], now: Instant) -> Option<Dispatch> {
        self.window.accumulate(batch);

        if !self.window.is_expired(now, self.config.window_duration)
            || !self.gate.is_open(now)
            || self.window.is_empty()
        {
            return None;
        }

        let (prediction, snapshot) = self.window.finalize_and_take(now).ok()?;
        let send_id = self
            .gate
            .acquire(now, prediction.clone(), Some(snapshot))?;

        Some(Dispatch {
            send_id,
            frame: wire_codec::encode(&prediction),
            prediction,
        })
    }

    fn on_frame_threshold(
        &mut self,
        batch: &[Sample],
        min_probability: f32,
        now: Instant,
    ) -> Option<Dispatch> {
        if !self.gate.is_open(now) {
            return None;
        }

        let candidate = batch.iter().find(|sample| {
            sample.probability > min_probability
                && self.last_dispatched_class.as_deref() != Some(sample.class_name.as_str())
        })?;

        let prediction = WinningPrediction::new(
            candidate.class_name.clone(),
            percent_half_up(100.0 * f64::from(candidate.probability)),
        );
        let send_id = self.gate.acquire(now, prediction.clone(), None)?;
        self.last_dispatched_class = Some(prediction.class_name.clone());

        Some(Dispatch {
            send_id,
            frame: wire_codec::encode(&prediction),
            prediction,
        })
    }

    /// `Ok(false)` from the link means it was not ready; that and any
    /// error count as a failed delivery. `Busy` also holds the gate shut
    /// for one window.
    pub fn on_send_done(
        &mut self,
        send_id: u64,
        result: &Result<bool, LinkError>,
        now: Instant,
    ) -> SendOutcome {
        let Some(in_flight) = self.gate.release(send_id) else {
            return SendOutcome::Stale { send_id };
        };

        match result {
            Ok(true) => {
                self.gate.last_send_time = Some(now);
                SendOutcome::Delivered {
                    prediction: in_flight.prediction,
                }
            }
            Ok(false) => {
                let prediction = self.recover(in_flight);
                SendOutcome::NotReady { prediction }
            }
            Err(error) => {
                if matches!(error, LinkError::Busy) {
                    self.gate.hold(now + self.config.window_duration);
                }
                let prediction = self.recover(in_flight);
                SendOutcome::Failed {
                    prediction,
                    reason: error.to_string(),
                }
            }
        }
    }

    /// Gives up on a send that has been outstanding for `send_timeout`.
    /// The abandoned write may still hold the link, so the gate stays shut
    /// for one more window.
    pub fn on_tick(&mut self, now: Instant) -> Option<SendOutcome> {
        let in_flight = self
            .gate
            .release_if_expired(now, self.config.send_timeout)?;
        self.gate.hold(now + self.config.window_duration);
        let after = now.saturating_duration_since(in_flight.started_at);
        let prediction = self.recover(in_flight);
        Some(SendOutcome::TimedOut { prediction, after })
    }

    fn recover(&mut self, in_flight: InFlight) -> WinningPrediction {
        if self.config.failure_policy == FailurePolicy::PreserveWindow {
            if let Some(snapshot) = in_flight.snapshot {
                self.window.restore(snapshot);
            }
            let failed_class = in_flight.prediction.class_name.as_str();
            if self.last_dispatched_class.as_deref() == Some(failed_class) {
                self.last_dispatched_class = None;
            }
        }
        in_flight.prediction
    }
}
