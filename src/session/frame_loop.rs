use crate::device_camera::interface::DeviceCamera;
use crate::image_classifier::interface::{ImageClassifier, Sample};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub type FrameResult = Result<Vec<Sample>, Box<dyn std::error::Error + Send + Sync>>;

/// Capture and classify loop running on its own thread.
///
/// `on_frame` receives every classification (or the error that replaced
/// it) and returns `false` to end the loop. Dropping or cancelling the
/// subscription stops the loop and waits for its thread, so no frame is
/// delivered after `cancel` returns.
pub struct FrameSubscription {
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FrameSubscription {
    pub fn start<F>(
        camera: Arc<dyn DeviceCamera + Send + Sync>,
        classifier: Arc<dyn ImageClassifier + Send + Sync>,
        interval: Duration,
        on_frame: F,
    ) -> Self
    where
        F: Fn(FrameResult, Instant) -> bool + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let loop_cancelled = cancelled.clone();

        let handle = thread::spawn(move || {
            while !loop_cancelled.load(Ordering::Acquire) {
                let started = Instant::now();
                let result = camera
                    .capture_frame()
                    .and_then(|frame| classifier.classify(&frame));

                if loop_cancelled.load(Ordering::Acquire) || !on_frame(result, Instant::now()) {
                    break;
                }

                let elapsed = started.elapsed();
                if elapsed < interval {
                    thread::park_timeout(interval - elapsed);
                }
            }
        });

        Self {
            cancelled,
            handle: Some(handle),
        }
    }

    #[allow(dead_code)]
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

impl Drop for FrameSubscription {
    fn drop(&mut self) {
        self.shutdown();
    }
}
