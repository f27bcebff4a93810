//! Marker pose representation and planar pose estimation.

use nalgebra::{Matrix3, Matrix3x4, Point2, Vector3};

use crate::{homography_from_4pt, CameraModel, DetectedMarker};

/// Camera-from-marker rigid transform `[R | t]`.
pub type PoseMatrix = Matrix3x4<f64>;

/// Column-major 4x4 matrix as consumed by OpenGL-style renderers.
pub type GlMatrix = [f64; 16];

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PoseEstimateError {
    #[error("marker width must be positive and finite, got {0}")]
    MarkerWidth(f64),
    #[error("camera intrinsics are singular")]
    SingularIntrinsics,
    #[error("marker corners are degenerate")]
    DegenerateCorners,
    #[error("rotation decomposition failed")]
    Decomposition,
}

/// Re-express a 3x4 pose in the column-major rendering convention, with the
/// bottom row set to `[0, 0, 0, 1]`.
pub fn gl_matrix_from_pose(pose: &PoseMatrix) -> GlMatrix {
    let mut gl = [0.0; 16];
    for col in 0..4 {
        for row in 0..3 {
            gl[col * 4 + row] = pose[(row, col)];
        }
    }
    gl[15] = 1.0;
    gl
}

/// Marker-plane corners (z = 0) of a square of side `width` centered at
/// `center`, starting upper-left and going clockwise when viewed from `+z`.
pub fn marker_object_corners(center: [f64; 2], width: f64) -> [Point2<f64>; 4] {
    let h = width / 2.0;
    let [cx, cy] = center;
    [
        Point2::new(cx - h, cy + h),
        Point2::new(cx + h, cy + h),
        Point2::new(cx + h, cy - h),
        Point2::new(cx - h, cy - h),
    ]
}

/// Estimate the camera-from-marker transform of a square marker.
///
/// The marker plane is mapped onto the normalized image plane with a
/// four-point homography, which is then split into rotation and
/// translation. Corners are taken as reported; lens distortion is not
/// compensated.
pub fn estimate_planar_pose(
    camera: &CameraModel,
    marker: &DetectedMarker,
    center: [f64; 2],
    width: f64,
) -> Result<PoseMatrix, PoseEstimateError> {
    if !(width.is_finite() && width > 0.0) {
        return Err(PoseEstimateError::MarkerWidth(width));
    }

    let k_inv = camera
        .projection()
        .try_inverse()
        .ok_or(PoseEstimateError::SingularIntrinsics)?;

    let object = marker_object_corners(center, width);
    let image = marker.oriented_vertices().map(|p| {
        let v = k_inv * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v[0] / v[2], v[1] / v[2])
    });

    let h = homography_from_4pt(&object, &image)
        .ok_or(PoseEstimateError::DegenerateCorners)?
        .h;

    let h1: Vector3<f64> = h.column(0).into_owned();
    let h2: Vector3<f64> = h.column(1).into_owned();
    let h3: Vector3<f64> = h.column(2).into_owned();

    let norm = (h1.norm() + h2.norm()) / 2.0;
    if norm < 1e-12 {
        return Err(PoseEstimateError::DegenerateCorners);
    }
    // marker must lie in front of the camera
    let scale = if h3.z < 0.0 { -1.0 / norm } else { 1.0 / norm };

    let r1 = h1 * scale;
    let r2 = h2 * scale;
    let t = h3 * scale;
    let r3 = r1.cross(&r2);

    let rotation = nearest_rotation(&Matrix3::from_columns(&[r1, r2, r3]))?;

    let mut pose = PoseMatrix::zeros();
    pose.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
    pose.set_column(3, &t);
    Ok(pose)
}

// Project onto SO(3) via SVD.
fn nearest_rotation(m: &Matrix3<f64>) -> Result<Matrix3<f64>, PoseEstimateError> {
    let svd = m.svd(true, true);
    let mut u = svd.u.ok_or(PoseEstimateError::Decomposition)?;
    let v_t = svd.v_t.ok_or(PoseEstimateError::Decomposition)?;
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        u.column_mut(2).neg_mut();
        r = u * v_t;
    }
    Ok(r)
}
