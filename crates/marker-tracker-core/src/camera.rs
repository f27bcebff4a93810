//! Pinhole camera model with clip planes.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::GlMatrix;

/// Number of stored distortion coefficients.
pub const DISTORTION_COEFFS: usize = 6;

/// Upper bound applied to `undistort_iterations` by the file loaders.
pub const MAX_UNDISTORT_ITERATIONS: u32 = 20;

pub const DEFAULT_NEAR_CLIP: f64 = 1.0;
pub const DEFAULT_FAR_CLIP: f64 = 1000.0;

fn default_near_clip() -> f64 {
    DEFAULT_NEAR_CLIP
}

fn default_far_clip() -> f64 {
    DEFAULT_FAR_CLIP
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CameraModelError {
    #[error("invalid image size {width}x{height}")]
    ImageSize { width: u32, height: u32 },
    #[error("invalid focal length ({fx}, {fy})")]
    FocalLength { fx: f64, fy: f64 },
    #[error("principal point ({cx}, {cy}) is not finite")]
    PrincipalPoint { cx: f64, cy: f64 },
    #[error("distortion coefficient {index} is not finite")]
    Distortion { index: usize },
    #[error("invalid clip planes (near={near}, far={far})")]
    ClipPlanes { near: f64, far: f64 },
}

/// Camera intrinsics plus the near/far planes used for rendering.
///
/// The projection matrix is derived from focal length and principal point;
/// distortion coefficients are carried for engines that undistort corners
/// but are not applied anywhere in this workspace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    /// `[width, height]` in pixels.
    pub image_size: [u32; 2],
    /// `[cx, cy]` in pixels.
    pub principal_point: [f64; 2],
    /// `[fx, fy]` in pixels.
    pub focal_length: [f64; 2],
    #[serde(default)]
    pub distortion: [f64; DISTORTION_COEFFS],
    #[serde(default)]
    pub undistort_iterations: u32,
    #[serde(default = "default_near_clip")]
    pub near_clip: f64,
    #[serde(default = "default_far_clip")]
    pub far_clip: f64,
}

impl CameraModel {
    /// Build a distortion-free model with the default clip planes.
    pub fn pinhole(image_size: [u32; 2], focal_length: [f64; 2], principal_point: [f64; 2]) -> Self {
        Self {
            image_size,
            principal_point,
            focal_length,
            distortion: [0.0; DISTORTION_COEFFS],
            undistort_iterations: 0,
            near_clip: DEFAULT_NEAR_CLIP,
            far_clip: DEFAULT_FAR_CLIP,
        }
    }

    /// Model used when no calibration file is available: a 400x400 image,
    /// principal point at the center and a focal length of 150 px.
    pub fn synthetic() -> Self {
        Self::pinhole([400, 400], [150.0, 150.0], [200.0, 200.0])
    }

    pub fn with_clip_planes(mut self, near_clip: f64, far_clip: f64) -> Self {
        self.near_clip = near_clip;
        self.far_clip = far_clip;
        self
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image_size[0]
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image_size[1]
    }

    /// Intrinsic matrix `K`: focal terms on the diagonal, principal point in
    /// the last column, `K[(2, 2)] = 1`.
    pub fn projection(&self) -> Matrix3<f64> {
        let [fx, fy] = self.focal_length;
        let [cx, cy] = self.principal_point;
        Matrix3::new(
            fx, 0.0, cx, //
            0.0, fy, cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Check that the model can be used for pose estimation and rendering.
    pub fn validate(&self) -> Result<(), CameraModelError> {
        let [width, height] = self.image_size;
        if width == 0 || height == 0 {
            return Err(CameraModelError::ImageSize { width, height });
        }
        let [fx, fy] = self.focal_length;
        if !(fx.is_finite() && fy.is_finite() && fx > 0.0 && fy > 0.0) {
            return Err(CameraModelError::FocalLength { fx, fy });
        }
        let [cx, cy] = self.principal_point;
        if !(cx.is_finite() && cy.is_finite()) {
            return Err(CameraModelError::PrincipalPoint { cx, cy });
        }
        if let Some(index) = self.distortion.iter().position(|k| !k.is_finite()) {
            return Err(CameraModelError::Distortion { index });
        }
        let (near, far) = (self.near_clip, self.far_clip);
        if !(near.is_finite() && far.is_finite() && near > 0.0 && near < far) {
            return Err(CameraModelError::ClipPlanes { near, far });
        }
        Ok(())
    }

    /// Column-major 4x4 perspective matrix for a renderer whose camera looks
    /// down `+z`, mapping the clip range `[near, far]` onto `[-1, 1]`.
    pub fn gl_projection(&self) -> GlMatrix {
        let w = self.width() as f64;
        let h = self.height() as f64;
        let k = self.projection();
        let (near, far) = (self.near_clip, self.far_clip);

        // Row-major q, transposed into column-major output below.
        let q = [
            [2.0 * k[(0, 0)] / w, 2.0 * k[(0, 1)] / w, 2.0 * k[(0, 2)] / w - 1.0, 0.0],
            [0.0, 2.0 * k[(1, 1)] / h, 2.0 * k[(1, 2)] / h - 1.0, 0.0],
            [0.0, 0.0, (far + near) / (far - near), -2.0 * far * near / (far - near)],
            [0.0, 0.0, 1.0, 0.0],
        ];

        let mut m = [0.0; 16];
        for (row, values) in q.iter().enumerate() {
            for (col, v) in values.iter().enumerate() {
                m[col * 4 + row] = *v;
            }
        }
        m
    }
}
