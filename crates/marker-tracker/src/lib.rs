//! Single-marker tracking on top of a pluggable detection engine.
//!
//! A [`TrackingSession`] owns a camera model, runs a [`DetectionEngine`] on
//! each frame, and computes the pose of one explicitly selected marker:
//!
//! ```no_run
//! use marker_tracker::core::{DetectedMarker, FrameView};
//! use marker_tracker::{DetectionEngine, DetectionEngineError, TrackerParams, TrackingSession};
//!
//! struct MyEngine;
//!
//! impl DetectionEngine for MyEngine {
//!     fn detect_markers(
//!         &mut self,
//!         _frame: &FrameView<'_>,
//!         _threshold: u8,
//!         _markers: &mut Vec<DetectedMarker>,
//!     ) -> Result<(), DetectionEngineError> {
//!         Ok(())
//!     }
//! }
//!
//! let mut session = TrackingSession::new(MyEngine, TrackerParams::default());
//! session.init_without_camera_file()?;
//!
//! let pixels = vec![0u8; 400 * 400];
//! let frame = FrameView::gray(400, 400, &pixels)?;
//! let ids = session.detect(&frame);
//! if let Some(id) = session.select_best_by_confidence() {
//!     println!("marker {id} at {:?} ({ids:?})", session.gl_pose());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Features
//!
//! - `cli` (default): the `marker-tracker` inspection binary.
//! - `image`: views over `image::GrayImage` / `image::RgbImage` buffers.
//! - `tracing`: spans on the detection path and a `tracing-subscriber` setup
//!   helper.

pub mod diagnostics;
pub mod engine;
pub mod io;
pub mod pattern;
pub mod session;

#[cfg(feature = "image")]
pub mod frame;

pub use marker_tracker_core as core;

pub use diagnostics::{Diagnostic, DiagnosticSink, LogSink, MemorySink, NullSink};
pub use engine::{
    CameraFileLoader, CameraLoader, DetectionEngine, DetectionEngineError, PlanarPoseEstimator,
    PoseEstimator,
};
pub use io::{TrackerConfig, TrackerConfigError, TrackerIoError};
pub use pattern::{PatternError, PatternGeometry, PatternId, PatternLoader, PatternStore};
pub use session::{
    DetectionHandle, DetectionSet, StaleDetectionHandle, TrackerInitError, TrackerParams,
    TrackingSession, DEFAULT_MARKER_WIDTH, DEFAULT_THRESHOLD,
};
