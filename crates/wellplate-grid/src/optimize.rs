//! Brute-force lattice fit for detected well centers.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::GridSearchParams;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Axis-aligned lattice `pixel = origin + (i * scale_x, j * scale_y)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridFit {
    pub x0: f64,
    pub y0: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Mean lattice residual of the fitted points, in grid units.
    pub error: f64,
}

impl GridFit {
    /// Pixel to grid coordinates.
    #[inline]
    pub fn to_grid(&self, p: Point2<f64>) -> Point2<f64> {
        to_grid(p, self.x0, self.y0, self.scale_x, self.scale_y)
    }
}

#[inline]
fn to_grid(p: Point2<f64>, x0: f64, y0: f64, sx: f64, sy: f64) -> Point2<f64> {
    Point2::new((p.x - x0) / sx, (p.y - y0) / sy)
}

/// Distance from a grid-space point to its nearest lattice node.
#[inline]
pub fn lattice_residual(g: Point2<f64>) -> f64 {
    (g.x.round_ties_even() - g.x).hypot(g.y.round_ties_even() - g.y)
}

/// Mean lattice residual of `points` under the candidate lattice.
pub fn grid_error(points: &[Point2<f64>], x0: f64, y0: f64, sx: f64, sy: f64) -> f64 {
    if points.is_empty() {
        return f64::INFINITY;
    }
    let sum: f64 = points
        .iter()
        .map(|&p| lattice_residual(to_grid(p, x0, y0, sx, sy)))
        .sum();
    sum / points.len() as f64
}

/// `n` evenly spaced values from `start` to `stop`, both included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i + 1 == n {
                        stop
                    } else {
                        start + i as f64 * step
                    }
                })
                .collect()
        }
    }
}

/// Exhaustive search over pitch and origin for the lattice that best explains `points`.
///
/// Candidates are visited pitch-x, pitch-y, origin-x, origin-y (outer to inner);
/// the first candidate with the lowest error wins. The returned origin is
/// reduced modulo the pitch. `None` for empty input or a non-positive estimate.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(points, params), fields(points = points.len()))
)]
pub fn optimize_grid(
    points: &[Point2<f64>],
    estimate: f64,
    params: &GridSearchParams,
) -> Option<GridFit> {
    if points.is_empty() || !(estimate > 0.0) || params.steps == 0 {
        return None;
    }
    let n = params.steps;

    let mut best: Option<GridFit> = None;
    let (span_x, span_y) = (params.scale_x_span, params.scale_y_span);
    for sx in linspace(estimate * (1.0 - span_x), estimate * (1.0 + span_x), n) {
        for sy in linspace(sx * (1.0 - span_y), sx * (1.0 + span_y), n) {
            for x0 in linspace(0.0, sx, n) {
                for y0 in linspace(0.0, sy, n) {
                    let error = grid_error(points, x0, y0, sx, sy);
                    if best.is_none_or(|b| error < b.error) {
                        best = Some(GridFit {
                            x0,
                            y0,
                            scale_x: sx,
                            scale_y: sy,
                            error,
                        });
                    }
                }
            }
        }
    }

    best.map(|b| GridFit {
        x0: b.x0 % b.scale_x,
        y0: b.y0 % b.scale_y,
        ..b
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linspace_includes_both_ends() {
        let v = linspace(0.96, 1.04, 9);
        assert_eq!(v.len(), 9);
        assert_relative_eq!(v[0], 0.96);
        assert_relative_eq!(v[4], 1.0, epsilon = 1e-12);
        assert_eq!(v[8], 1.04);
        assert_eq!(linspace(3.0, 5.0, 1), vec![3.0]);
        assert!(linspace(3.0, 5.0, 0).is_empty());
    }

    #[test]
    fn residual_is_zero_on_nodes_and_half_diagonal_at_cell_center() {
        assert_eq!(lattice_residual(Point2::new(3.0, -2.0)), 0.0);
        assert_relative_eq!(
            lattice_residual(Point2::new(0.5, 1.5)),
            std::f64::consts::FRAC_1_SQRT_2
        );
    }

    #[test]
    fn exact_lattice_has_zero_error() {
        let pts: Vec<_> = (0..4)
            .flat_map(|j| {
                (0..5).map(move |i| Point2::new(12.0 + 30.0 * i as f64, 7.0 + 31.0 * j as f64))
            })
            .collect();
        assert_relative_eq!(grid_error(&pts, 12.0, 7.0, 30.0, 31.0), 0.0);
        assert!(grid_error(&pts, 27.0, 7.0, 30.0, 31.0) > 0.4);
        assert_eq!(grid_error(&[], 0.0, 0.0, 1.0, 1.0), f64::INFINITY);
    }

    #[test]
    fn origin_is_reduced_modulo_pitch() {
        // lattice with origin exactly one pitch away from zero
        let pts: Vec<_> = (1..4)
            .flat_map(|j| (1..4).map(move |i| Point2::new(40.0 * i as f64, 40.0 * j as f64)))
            .collect();
        let fit = optimize_grid(&pts, 40.0, &GridSearchParams::default()).expect("fit");
        assert!(fit.x0 >= 0.0 && fit.x0 < fit.scale_x);
        assert!(fit.y0 >= 0.0 && fit.y0 < fit.scale_y);
        assert!(fit.error < 1e-9, "{fit:?}");
    }

    #[test]
    fn degenerate_inputs_give_no_fit() {
        let params = GridSearchParams::default();
        assert!(optimize_grid(&[], 30.0, &params).is_none());
        assert!(optimize_grid(&[Point2::new(1.0, 1.0)], 0.0, &params).is_none());
        assert!(optimize_grid(&[Point2::new(1.0, 1.0)], f64::NAN, &params).is_none());
    }
}
