//! Advisory diagnostics emitted by a tracking session.
//!
//! Diagnostics never drive control flow; every failure is also returned to
//! the caller as a value. A session reports to a [`NullSink`] unless another
//! sink is installed.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::Level;
use marker_tracker_core::PixelFormat;

#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    UnsupportedPixelFormat(PixelFormat),
    CameraLoadFailed { path: PathBuf, reason: String },
    InvalidCamera { reason: String },
    NotInitialized,
    FrameFormatMismatch { expected: PixelFormat, got: PixelFormat },
    DetectionFailed { reason: String },
    PoseEstimateFailed { id: i32, reason: String },
    PatternLoadFailed { path: PathBuf, code: i32, reason: String },
}

impl Diagnostic {
    /// Severity used when forwarding to the `log` facade.
    pub fn level(&self) -> Level {
        match self {
            Diagnostic::DetectionFailed { .. } => Level::Debug,
            Diagnostic::NotInitialized | Diagnostic::PoseEstimateFailed { .. } => Level::Info,
            _ => Level::Warn,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnsupportedPixelFormat(format) => {
                write!(f, "invalid pixel format {format:?}")
            }
            Diagnostic::CameraLoadFailed { path, reason } => {
                write!(f, "error loading camera file {}: {reason}", path.display())
            }
            Diagnostic::InvalidCamera { reason } => write!(f, "rejected camera model: {reason}"),
            Diagnostic::NotInitialized => write!(f, "session used before initialization"),
            Diagnostic::FrameFormatMismatch { expected, got } => {
                write!(f, "frame is {got:?}, session expects {expected:?}")
            }
            Diagnostic::DetectionFailed { reason } => write!(f, "detection failed: {reason}"),
            Diagnostic::PoseEstimateFailed { id, reason } => {
                write!(f, "pose estimation failed for marker {id}: {reason}")
            }
            Diagnostic::PatternLoadFailed { path, code, reason } => write!(
                f,
                "error loading pattern {} (code {code}): {reason}",
                path.display()
            ),
        }
    }
}

/// Receiver for session diagnostics.
pub trait DiagnosticSink: Send {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&self, _diagnostic: &Diagnostic) {}
}

/// Forwards to the `log` facade at [`Diagnostic::level`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, diagnostic: &Diagnostic) {
        log::log!(target: "marker_tracker", diagnostic.level(), "{diagnostic}");
    }
}

/// Keeps every diagnostic in memory. Clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything reported so far.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Drain the buffer.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(
            &mut *self
                .entries
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(diagnostic.clone());
    }
}
