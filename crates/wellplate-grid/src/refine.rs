//! Per-plate well grid refinement.

use image::imageops::crop_imm;
use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use wellplate_core::{Affine2, PlateBox, WellGrid};

use crate::hough::{hough_circles, Circle, CircleSearch};
use crate::optimize::{lattice_residual, optimize_grid, GridFit};
use crate::{GridCalibration, RefineParams};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Full result of a successful refinement, for diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlateRefinement {
    pub grid: WellGrid,
    pub fit: GridFit,
    /// Circle centers inside the plate box, rounded to pixels.
    pub centers: Vec<Point2<f64>>,
    /// Parallel to `centers`: residual below the outlier threshold.
    pub inliers: Vec<bool>,
}

impl PlateRefinement {
    pub fn inlier_count(&self) -> usize {
        self.inliers.iter().filter(|&&b| b).count()
    }
}

/// Expected well radius for a plate box.
pub fn expected_radius(plate: &PlateBox, calib: &GridCalibration) -> f64 {
    plate.diagonal() / calib.radius_divisor
}

/// Detect well circles for `plate` on a grayscale frame.
///
/// Circles are searched on a blurred crop around the box (padded by the
/// largest radius) and reported in frame coordinates; only centers strictly
/// inside the box are kept.
pub fn detect_plate_circles(
    gray: &GrayImage,
    plate: &PlateBox,
    params: &RefineParams,
) -> Vec<Circle> {
    let radius = expected_radius(plate, &params.calibration);
    let tol = params.hough.radius_tolerance;
    let min_radius = (radius * (1.0 - tol)).round_ties_even().max(1.0) as u32;
    let max_radius = (radius * (1.0 + tol)).round_ties_even().max(1.0) as u32;

    let pad = max_radius as i64 + 2;
    let (w, h) = (gray.width() as i64, gray.height() as i64);
    let x0 = (plate.min_x() as i64 - pad).clamp(0, w);
    let y0 = (plate.min_y() as i64 - pad).clamp(0, h);
    let x1 = (plate.max_x() as i64 + pad + 1).clamp(0, w);
    let y1 = (plate.max_y() as i64 + pad + 1).clamp(0, h);
    if x1 - x0 < 3 || y1 - y0 < 3 {
        return Vec::new();
    }

    let (cw, ch) = ((x1 - x0) as u32, (y1 - y0) as u32);
    let crop = crop_imm(gray, x0 as u32, y0 as u32, cw, ch).to_image();
    let blurred = if params.hough.blur_sigma > 0.0 {
        gaussian_blur_f32(&crop, params.hough.blur_sigma)
    } else {
        crop
    };

    let search = CircleSearch {
        min_radius,
        max_radius,
        min_dist: radius * params.hough.min_dist_factor,
        canny_low: params.hough.canny_high / 2.0,
        canny_high: params.hough.canny_high,
        accumulator_threshold: params.hough.accumulator_threshold,
    };
    hough_circles(&blurred, &search)
        .into_iter()
        .map(|c| Circle {
            x: c.x + x0 as f32,
            y: c.y + y0 as f32,
            ..c
        })
        .filter(|c| plate.strictly_contains(c.x as f64, c.y as f64))
        .collect()
}

/// Fit the plate lattice to circle centers.
///
/// Runs the grid search, drops centers whose lattice residual is not below
/// `outlier_threshold`, and moves the origin onto the first inlier row and
/// column so that well `(0, 0)` is the first real well. `None` when fewer than
/// `min_circles` centers are given or survive as inliers.
pub fn fit_plate_grid(
    centers: &[Point2<f64>],
    plate: &PlateBox,
    params: &RefineParams,
) -> Option<PlateRefinement> {
    let calib = &params.calibration;
    if centers.len() < calib.min_circles.max(1) {
        let (found, need) = (centers.len(), calib.min_circles);
        log::debug!("plate {plate:?}: {found} circles, need {need}");
        return None;
    }

    let estimate = plate.diagonal() / calib.spacing_divisor;
    let fit = optimize_grid(centers, estimate, &params.search)?;

    let mut inliers = Vec::with_capacity(centers.len());
    let mut first_col = i64::MAX;
    let mut first_row = i64::MAX;
    for &c in centers {
        let g = fit.to_grid(c);
        let ok = lattice_residual(g) < calib.outlier_threshold;
        if ok {
            first_col = first_col.min(g.x.round_ties_even() as i64);
            first_row = first_row.min(g.y.round_ties_even() as i64);
        }
        inliers.push(ok);
    }

    let n_in = inliers.iter().filter(|&&b| b).count();
    if n_in < calib.min_circles.max(1) {
        log::debug!("plate {plate:?}: {n_in} inliers of {}", centers.len());
        return None;
    }

    let transform = Affine2::from_scale_translation(
        fit.scale_x,
        fit.scale_y,
        fit.x0 + first_col as f64 * fit.scale_x,
        fit.y0 + first_row as f64 * fit.scale_y,
    );
    log::debug!(
        "plate {plate:?}: pitch ({:.2}, {:.2}) px, {n_in}/{} inliers, mean residual {:.3}",
        fit.scale_x,
        fit.scale_y,
        centers.len(),
        fit.error
    );
    Some(PlateRefinement {
        grid: WellGrid {
            transform,
            plate: *plate,
        },
        fit,
        centers: centers.to_vec(),
        inliers,
    })
}

/// Detect circles in `plate` and fit its well grid, keeping diagnostics.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(gray, params),
        fields(width = gray.width(), height = gray.height())
    )
)]
pub fn refine_plate_detailed(
    gray: &GrayImage,
    plate: &PlateBox,
    params: &RefineParams,
) -> Option<PlateRefinement> {
    let px = |v: f32| (v as f64).round_ties_even();
    let centers: Vec<Point2<f64>> = detect_plate_circles(gray, plate, params)
        .iter()
        .map(|c| Point2::new(px(c.x), px(c.y)))
        .collect();
    fit_plate_grid(&centers, plate, params)
}

/// Well grid for one plate box, or `None` when the plate cannot be resolved.
pub fn refine_plate(gray: &GrayImage, plate: &PlateBox, params: &RefineParams) -> Option<WellGrid> {
    refine_plate_detailed(gray, plate, params).map(|r| r.grid)
}
