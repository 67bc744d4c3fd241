//! Progress events and cooperative cancellation

use crate::constants::MIN_ELAPSED_SECONDS;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Pipeline stage a [`ProgressEvent`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPhase {
    LoadImage,
    Merge,
    Grid,
    RenderPlan,
    RenderPages,
    Export,
}

impl JobPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            JobPhase::LoadImage => "load_image",
            JobPhase::Merge => "merge",
            JobPhase::Grid => "grid",
            JobPhase::RenderPlan => "render_plan",
            JobPhase::RenderPages => "render_pages",
            JobPhase::Export => "export",
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub phase: JobPhase,
    pub done: usize,
    pub total: usize,
    pub message: String,
    /// Seconds since the job started
    pub elapsed_seconds: f64,
    /// Only set while rendering pages
    pub pages_per_second: f64,
    pub eta_seconds: Option<f64>,
}

impl ProgressEvent {
    pub fn new(phase: JobPhase, done: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            phase,
            done,
            total,
            message: message.into(),
            elapsed_seconds: 0.0,
            pages_per_second: 0.0,
            eta_seconds: None,
        }
    }

    /// Fill in timing fields for an event emitted `elapsed` seconds into a job
    pub fn with_timing(mut self, elapsed: f64) -> Self {
        self.elapsed_seconds = elapsed;
        if self.phase == JobPhase::RenderPages && self.done > 0 && elapsed > MIN_ELAPSED_SECONDS {
            let speed = self.done as f64 / elapsed.max(MIN_ELAPSED_SECONDS);
            let remaining = self.total.saturating_sub(self.done);
            self.pages_per_second = speed;
            self.eta_seconds = Some(if speed > 0.0 && remaining > 0 {
                remaining as f64 / speed
            } else {
                0.0
            });
        }
        self
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Progress callback handed to a job
pub type ProgressCallback<'a> = &'a mut dyn FnMut(&ProgressEvent);

/// Stamps events with timing and forwards them to an optional callback
pub(crate) struct Reporter<'a> {
    started: Instant,
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> Reporter<'a> {
    pub fn new(callback: Option<ProgressCallback<'a>>) -> Self {
        Self {
            started: Instant::now(),
            callback,
        }
    }

    pub fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn report(
        &mut self,
        phase: JobPhase,
        done: usize,
        total: usize,
        message: impl Into<String>,
    ) {
        let elapsed = self.elapsed();
        if let Some(callback) = self.callback.as_deref_mut() {
            let event = ProgressEvent::new(phase, done, total, message).with_timing(elapsed);
            callback(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timing_fields() {
        let event = ProgressEvent::new(JobPhase::LoadImage, 0, 1, "");
        assert_eq!(event.elapsed_seconds, 0.0);
        assert_eq!(event.pages_per_second, 0.0);
        assert_eq!(event.eta_seconds, None);
        assert!(event.message.is_empty());
    }

    #[test]
    fn test_speed_and_eta_while_rendering() {
        let event = ProgressEvent::new(JobPhase::RenderPages, 5, 10, "").with_timing(2.5);
        assert_eq!(event.elapsed_seconds, 2.5);
        assert_eq!(event.pages_per_second, 2.0);
        assert_eq!(event.eta_seconds, Some(2.5));

        let done = ProgressEvent::new(JobPhase::RenderPages, 10, 10, "").with_timing(5.0);
        assert_eq!(done.eta_seconds, Some(0.0));
    }

    #[test]
    fn test_no_speed_outside_rendering() {
        let event = ProgressEvent::new(JobPhase::Grid, 1, 1, "").with_timing(3.0);
        assert_eq!(event.elapsed_seconds, 3.0);
        assert_eq!(event.pages_per_second, 0.0);
        assert_eq!(event.eta_seconds, None);

        let start = ProgressEvent::new(JobPhase::RenderPages, 0, 4, "").with_timing(3.0);
        assert_eq!(start.eta_seconds, None);

        let instant = ProgressEvent::new(JobPhase::RenderPages, 1, 4, "").with_timing(0.0005);
        assert_eq!(instant.pages_per_second, 0.0);
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(JobPhase::LoadImage.to_string(), "load_image");
        assert_eq!(JobPhase::RenderPages.as_str(), "render_pages");
    }
}
