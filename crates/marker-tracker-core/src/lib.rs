//! Core types for single-marker tracking.
//!
//! This crate holds everything that does not depend on a concrete detection
//! engine: the camera model and its calibration file formats, the frame
//! view handed to engines, the raw marker record engines produce, and the
//! planar pose math used to turn one marker into a camera-space transform.

mod camera;
mod camera_io;
mod homography;
mod image;
mod logger;
mod marker;
mod pose;

pub use camera::{
    CameraModel, CameraModelError, DEFAULT_FAR_CLIP, DEFAULT_NEAR_CLIP, DISTORTION_COEFFS,
    MAX_UNDISTORT_ITERATIONS,
};
pub use camera_io::{load_camera_file, CameraLoadError, CAMCAL_HEADER};
pub use homography::{homography_from_4pt, Homography};
pub use image::{FrameError, FrameView, PixelFormat};
pub use marker::{DetectedMarker, INVALID_MARKER_ID};
pub use pose::{
    estimate_planar_pose, gl_matrix_from_pose, marker_object_corners, GlMatrix, PoseEstimateError,
    PoseMatrix,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init, init_with_level, LoggerConfig};
