//! Bounded-retry single-frame capture.
//!
//! Each attempt opens the camera, reads one frame, and drops the handle.
//! `Idle → Attempting(1..=n) → Success | Exhausted`.

use crate::camera::{CameraError, CameraHandle, CameraSource};
use crate::frame::{Frame, FrameError};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Why a single attempt produced no frame. Retried, never returned to callers.
#[derive(Error, Debug)]
pub enum TransientFailure {
    #[error("camera: {0}")]
    Camera(#[from] CameraError),
    #[error("frame conversion: {0}")]
    Frame(#[from] FrameError),
}

/// Outcome of [`FrameAcquirer::capture`].
#[derive(Debug)]
pub enum Capture {
    Success(Frame),
    Exhausted {
        attempts: usize,
        /// Error raised by the final attempt, if it raised one rather than
        /// just reporting no frame.
        last_error: Option<TransientFailure>,
    },
}

impl Capture {
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            Capture::Success(frame) => Some(frame),
            Capture::Exhausted { .. } => None,
        }
    }
}

enum Attempt {
    Frame(Frame),
    NoFrame,
    Failed(TransientFailure),
}

/// Produces at most one RGB frame per call from a flaky camera.
pub struct FrameAcquirer<S> {
    source: S,
    max_attempts: usize,
    retry_delay: Duration,
}

impl<S: CameraSource> FrameAcquirer<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Attempt budget per capture; clamped to at least one.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run the attempt loop and report the typed outcome.
    pub fn capture(&self) -> Capture {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match self.attempt() {
                Attempt::Frame(frame) => {
                    tracing::debug!(attempt, width = frame.width, height = frame.height, "frame captured");
                    return Capture::Success(frame);
                }
                Attempt::NoFrame => {
                    tracing::debug!(attempt, "camera returned no frame");
                    last_error = None;
                }
                Attempt::Failed(e) => {
                    tracing::debug!(attempt, error = %e, "capture attempt failed");
                    last_error = Some(e);
                }
            }

            if attempt < self.max_attempts && !self.retry_delay.is_zero() {
                std::thread::sleep(self.retry_delay);
            }
        }

        Capture::Exhausted {
            attempts: self.max_attempts,
            last_error,
        }
    }

    /// Capture one frame, or `None` after the attempt budget is spent.
    ///
    /// Exhaustion is logged once at `warn`; it is never an error.
    pub fn capture_frame(&self) -> Option<Frame> {
        match self.capture() {
            Capture::Success(frame) => Some(frame),
            Capture::Exhausted {
                attempts,
                last_error: Some(e),
            } => {
                tracing::warn!(attempts, error = %e, "could not read from camera");
                None
            }
            Capture::Exhausted {
                attempts,
                last_error: None,
            } => {
                tracing::warn!(attempts, "could not read from camera");
                None
            }
        }
    }

    fn attempt(&self) -> Attempt {
        let mut handle = match self.source.open() {
            Ok(h) => h,
            Err(e) => return Attempt::Failed(e.into()),
        };
        let read = handle.read_frame();
        // Release before converting; the device is never held across attempts.
        drop(handle);

        match read {
            Ok(Some(raw)) => match Frame::from_raw(&raw) {
                Ok(frame) => Attempt::Frame(frame),
                Err(e) => Attempt::Failed(e.into()),
            },
            Ok(None) => Attempt::NoFrame,
            Err(e) => Attempt::Failed(e.into()),
        }
    }
}
