//! 2D affine transforms stored as 3x3 homogeneous matrices.
//!
//! The bottom row is always `[0, 0, 1]`; every constructor enforces it.

use nalgebra::{Matrix3, Point2, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Affine map between two planar coordinate systems.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Affine2 {
    pub m: Matrix3<f64>,
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine2 {
    pub fn identity() -> Self {
        Self {
            m: Matrix3::identity(),
        }
    }

    /// Axis-aligned scale followed by translation: `p -> (sx * x + tx, sy * y + ty)`.
    pub fn from_scale_translation(sx: f64, sy: f64, tx: f64, ty: f64) -> Self {
        Self {
            m: Matrix3::new(sx, 0.0, tx, 0.0, sy, ty, 0.0, 0.0, 1.0),
        }
    }

    /// Frame spanned by two axis vectors at `origin`: `(u, v) -> origin + u * ex + v * ey`.
    pub fn from_frame(origin: Point2<f64>, ex: Vector2<f64>, ey: Vector2<f64>) -> Self {
        Self {
            m: Matrix3::new(
                ex.x, ey.x, origin.x, //
                ex.y, ey.y, origin.y, //
                0.0, 0.0, 1.0,
            ),
        }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.m * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v.x, v.y)
    }

    /// Inverse map; `None` when the linear part is singular.
    pub fn inverse(&self) -> Option<Self> {
        let inv = self.m.try_inverse()?;
        let mut m = inv;
        // keep the affine row exact after inversion
        m[(2, 0)] = 0.0;
        m[(2, 1)] = 0.0;
        m[(2, 2)] = 1.0;
        Some(Self { m })
    }

    #[inline]
    pub fn scale_x(&self) -> f64 {
        self.m[(0, 0)]
    }

    #[inline]
    pub fn scale_y(&self) -> f64 {
        self.m[(1, 1)]
    }

    #[inline]
    pub fn translation(&self) -> Vector2<f64> {
        Vector2::new(self.m[(0, 2)], self.m[(1, 2)])
    }
}
