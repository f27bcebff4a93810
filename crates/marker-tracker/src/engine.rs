//! Collaborator contracts used by [`TrackingSession`](crate::TrackingSession).

use std::path::Path;

use marker_tracker_core::{
    estimate_planar_pose, load_camera_file, CameraLoadError, CameraModel, DetectedMarker,
    FrameError, FrameView, PixelFormat, PoseEstimateError, PoseMatrix,
};

/// Failure status reported by a detection engine for one frame.
#[derive(thiserror::Error, Debug)]
pub enum DetectionEngineError {
    #[error("detection engine returned status {0}")]
    Status(i32),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("{0}")]
    Other(String),
}

/// Raster marker detector.
///
/// Implementations scan one frame and append every candidate quad they find
/// to `markers`, including candidates that could not be matched to a
/// pattern (reported with id [`INVALID_MARKER_ID`](marker_tracker_core::INVALID_MARKER_ID)).
/// Order is engine-defined and is preserved by the session.
pub trait DetectionEngine {
    /// Whether frames in `format` can be processed. Checked by every session
    /// initialization path before a camera is installed.
    fn supports_pixel_format(&self, format: PixelFormat) -> bool {
        format == PixelFormat::Luminance8
    }

    fn detect_markers(
        &mut self,
        frame: &FrameView<'_>,
        threshold: u8,
        markers: &mut Vec<DetectedMarker>,
    ) -> Result<(), DetectionEngineError>;
}

/// Turns one detected marker into a camera-from-marker transform.
pub trait PoseEstimator {
    fn estimate_pose(
        &mut self,
        camera: &CameraModel,
        marker: &DetectedMarker,
        center: [f64; 2],
        width: f64,
    ) -> Result<PoseMatrix, PoseEstimateError>;
}

/// Homography-based estimator for square planar markers.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlanarPoseEstimator;

impl PoseEstimator for PlanarPoseEstimator {
    fn estimate_pose(
        &mut self,
        camera: &CameraModel,
        marker: &DetectedMarker,
        center: [f64; 2],
        width: f64,
    ) -> Result<PoseMatrix, PoseEstimateError> {
        estimate_planar_pose(camera, marker, center, width)
    }
}

/// Source of camera models for `init_with_camera_file`.
pub trait CameraLoader: Send {
    fn load_camera(
        &self,
        path: &Path,
        near_clip: f64,
        far_clip: f64,
    ) -> Result<CameraModel, CameraLoadError>;
}

/// Reads JSON and `ARToolKitPlus_CamCal_Rev02` text files from disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct CameraFileLoader;

impl CameraLoader for CameraFileLoader {
    fn load_camera(
        &self,
        path: &Path,
        near_clip: f64,
        far_clip: f64,
    ) -> Result<CameraModel, CameraLoadError> {
        load_camera_file(path, near_clip, far_clip)
    }
}
