use std::path::PathBuf;

use marker_tracker_core::{CameraLoadError, CameraModelError, PixelFormat};

/// Errors returned by the session initialization paths.
#[derive(thiserror::Error, Debug)]
pub enum TrackerInitError {
    #[error("pixel format {0:?} is not supported by the detection engine")]
    UnsupportedPixelFormat(PixelFormat),
    #[error("failed to load camera file {}", path.display())]
    CameraLoad {
        path: PathBuf,
        #[source]
        source: CameraLoadError,
    },
    #[error(transparent)]
    InvalidCamera(#[from] CameraModelError),
}
