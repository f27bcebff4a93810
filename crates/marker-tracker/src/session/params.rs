use marker_tracker_core::PixelFormat;
use serde::{Deserialize, Serialize};

use crate::pattern::PatternGeometry;

pub const DEFAULT_THRESHOLD: u8 = 100;
pub const DEFAULT_MARKER_WIDTH: f64 = 2.0;

/// Tunable session parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerParams {
    /// Binarization threshold passed to the detection engine.
    pub threshold: u8,
    /// Physical side length of the tracked marker, in scene units.
    pub marker_width: f64,
    /// Offset of the marker origin from its geometric center.
    pub marker_center: [f64; 2],
    /// Layout of the frames the session will be fed.
    pub pixel_format: PixelFormat,
    pub pattern: PatternGeometry,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            marker_width: DEFAULT_MARKER_WIDTH,
            marker_center: [0.0, 0.0],
            pixel_format: PixelFormat::Luminance8,
            pattern: PatternGeometry::default(),
        }
    }
}
