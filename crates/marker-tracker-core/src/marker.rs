use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Identifier reported for candidates the engine could not match.
pub const INVALID_MARKER_ID: i32 = -1;

/// One raw marker candidate as reported by a detection engine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedMarker {
    /// Pattern id, or [`INVALID_MARKER_ID`].
    pub id: i32,
    /// Match quality in `[0, 1]`.
    pub confidence: f32,
    /// Enclosed area in pixels.
    pub area: u32,
    pub center: Point2<f64>,
    /// Quad corners in image pixels, in the engine's scan order.
    pub vertices: [Point2<f64>; 4],
    /// Rotation `0..=3` of `vertices` relative to the pattern's upright
    /// orientation.
    pub direction: u8,
}

impl DetectedMarker {
    /// Build a record from its corner quad; center and area are derived.
    pub fn from_corners(
        id: i32,
        confidence: f32,
        vertices: [Point2<f64>; 4],
        direction: u8,
    ) -> Self {
        let cx = vertices.iter().map(|p| p.x).sum::<f64>() / 4.0;
        let cy = vertices.iter().map(|p| p.y).sum::<f64>() / 4.0;

        // shoelace
        let twice_area: f64 = (0..4)
            .map(|i| {
                let (a, b) = (vertices[i], vertices[(i + 1) % 4]);
                a.x * b.y - b.x * a.y
            })
            .sum();

        Self {
            id,
            confidence,
            area: (twice_area.abs() / 2.0).round() as u32,
            center: Point2::new(cx, cy),
            vertices,
            direction: direction & 3,
        }
    }

    /// `false` for candidates carrying [`INVALID_MARKER_ID`].
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.id != INVALID_MARKER_ID
    }

    /// Corners reordered so that index 0 is the pattern's upper-left corner.
    pub fn oriented_vertices(&self) -> [Point2<f64>; 4] {
        let dir = (self.direction & 3) as usize;
        std::array::from_fn(|i| self.vertices[(4 - dir + i) % 4])
    }
}
