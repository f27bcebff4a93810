//! Single-marker tracking session.
//!
//! A session owns one camera model, caches the raw detection set of the most
//! recent frame, and keeps the pose of the last explicitly selected marker.

mod detections;
mod error;
mod params;
mod tracker;

pub use detections::{DetectionHandle, DetectionSet, StaleDetectionHandle};
pub use error::TrackerInitError;
pub use params::{TrackerParams, DEFAULT_MARKER_WIDTH, DEFAULT_THRESHOLD};
pub use tracker::TrackingSession;
