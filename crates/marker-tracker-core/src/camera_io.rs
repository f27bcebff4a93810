//! Camera calibration files.
//!
//! Two formats are accepted:
//! - JSON: a serialized [`CameraModel`] (files ending in `.json`),
//! - text: the `ARToolKitPlus_CamCal_Rev02` layout, a header line followed by
//!   `xsize ysize cc_x cc_y fc_x fc_y kc1 .. kc6 undist_iterations`.
//!
//! Lines starting with `#` are ignored in the text format.

use std::{fs, path::Path};

use crate::camera::{CameraModel, CameraModelError, DISTORTION_COEFFS, MAX_UNDISTORT_ITERATIONS};

pub const CAMCAL_HEADER: &str = "ARToolKitPlus_CamCal_Rev02";

const CAMCAL_FIELDS: [&str; 13] = [
    "xsize",
    "ysize",
    "cc_x",
    "cc_y",
    "fc_x",
    "fc_y",
    "kc1",
    "kc2",
    "kc3",
    "kc4",
    "kc5",
    "kc6",
    "undist_iterations",
];

#[derive(thiserror::Error, Debug)]
pub enum CameraLoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("missing `ARToolKitPlus_CamCal_Rev02` header")]
    MissingHeader,
    #[error("expected {expected} calibration values, found {got}")]
    ValueCount { expected: usize, got: usize },
    #[error("cannot parse `{value}` as {field}")]
    Parse { field: &'static str, value: String },
    #[error(transparent)]
    Invalid(#[from] CameraModelError),
}

fn parse_field<T: std::str::FromStr>(
    field: &'static str,
    value: &str,
) -> Result<T, CameraLoadError> {
    value.parse().map_err(|_| CameraLoadError::Parse {
        field,
        value: value.to_owned(),
    })
}

impl CameraModel {
    /// Parse the text calibration format. Clip planes are left at their
    /// defaults; the result is not validated.
    pub fn from_calib_text(text: &str) -> Result<Self, CameraLoadError> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));

        if lines.next() != Some(CAMCAL_HEADER) {
            return Err(CameraLoadError::MissingHeader);
        }

        let values: Vec<&str> = lines.flat_map(str::split_whitespace).collect();
        if values.len() != CAMCAL_FIELDS.len() {
            return Err(CameraLoadError::ValueCount {
                expected: CAMCAL_FIELDS.len(),
                got: values.len(),
            });
        }

        let width: u32 = parse_field(CAMCAL_FIELDS[0], values[0])?;
        let height: u32 = parse_field(CAMCAL_FIELDS[1], values[1])?;
        let mut floats = [0.0f64; 4 + DISTORTION_COEFFS];
        for (i, slot) in floats.iter_mut().enumerate() {
            *slot = parse_field(CAMCAL_FIELDS[i + 2], values[i + 2])?;
        }
        let iterations: u32 = parse_field(CAMCAL_FIELDS[12], values[12])?;

        let mut distortion = [0.0; DISTORTION_COEFFS];
        distortion.copy_from_slice(&floats[4..]);

        let mut model = CameraModel::pinhole(
            [width, height],
            [floats[2], floats[3]],
            [floats[0], floats[1]],
        );
        model.distortion = distortion;
        model.undistort_iterations = iterations.min(MAX_UNDISTORT_ITERATIONS);
        Ok(model)
    }

    /// Render the text calibration format.
    pub fn to_calib_text(&self) -> String {
        let kc: Vec<String> = self.distortion.iter().map(|k| k.to_string()).collect();
        format!(
            "{CAMCAL_HEADER}\n{} {} {} {} {} {} {} {}\n",
            self.image_size[0],
            self.image_size[1],
            self.principal_point[0],
            self.principal_point[1],
            self.focal_length[0],
            self.focal_length[1],
            kc.join(" "),
            self.undistort_iterations
        )
    }

    /// Load a JSON camera model from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CameraLoadError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this model to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CameraLoadError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Load a camera file in either supported format, install the given clip
/// planes and validate the result.
pub fn load_camera_file(
    path: impl AsRef<Path>,
    near_clip: f64,
    far_clip: f64,
) -> Result<CameraModel, CameraLoadError> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let model = if is_json {
        CameraModel::load_json(path)?
    } else {
        CameraModel::from_calib_text(&fs::read_to_string(path)?)?
    };
    let model = model.with_clip_planes(near_clip, far_clip);
    model.validate()?;
    log::debug!(
        "loaded camera {}x{} from {}",
        model.width(),
        model.height(),
        path.display()
    );
    Ok(model)
}
