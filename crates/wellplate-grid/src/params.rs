//! Tunables for circle detection and grid fitting.
//!
//! The defaults are calibration data for one camera rig and a standard
//! 96-well plate; they are meant to be overridden from a config file.

use serde::{Deserialize, Serialize};

/// Plate geometry relative to the plate box diagonal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridCalibration {
    /// Expected well radius is `diagonal / radius_divisor`.
    pub radius_divisor: f64,
    /// Initial well pitch is `diagonal / spacing_divisor`.
    pub spacing_divisor: f64,
    /// Lattice residual (grid units) below which a circle counts as an inlier.
    pub outlier_threshold: f64,
    /// Minimum number of circles, and of inliers, for a grid.
    pub min_circles: usize,
    pub plate_rows: usize,
    pub plate_cols: usize,
}

impl Default for GridCalibration {
    fn default() -> Self {
        Self {
            radius_divisor: 55.0,
            spacing_divisor: 16.37,
            outlier_threshold: 0.2,
            min_circles: 4,
            plate_rows: wellplate_core::PLATE_ROWS,
            plate_cols: wellplate_core::PLATE_COLS,
        }
    }
}

/// Circle search settings; radii are relative to the expected well radius.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughParams {
    pub blur_sigma: f32,
    /// Upper Canny threshold; the lower one is half of it.
    pub canny_high: f32,
    /// Minimum center votes, and minimum edge support of the chosen radius.
    pub accumulator_threshold: u32,
    /// Minimum center distance as a multiple of the expected radius.
    pub min_dist_factor: f64,
    /// Accepted radius range is `r * (1 ± radius_tolerance)`.
    pub radius_tolerance: f64,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            blur_sigma: 0.75,
            canny_high: 80.0,
            accumulator_threshold: 10,
            min_dist_factor: 2.5,
            radius_tolerance: 0.05,
        }
    }
}

/// Resolution of the brute-force grid search.
///
/// Pitch x spans `estimate * (1 ± scale_x_span)`, pitch y spans
/// `pitch_x * (1 ± scale_y_span)`, each origin coordinate spans one pitch;
/// every axis is sampled at `steps` evenly spaced values, ends included.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSearchParams {
    pub steps: usize,
    pub scale_x_span: f64,
    pub scale_y_span: f64,
}

impl Default for GridSearchParams {
    fn default() -> Self {
        Self {
            steps: 9,
            scale_x_span: 0.04,
            scale_y_span: 0.02,
        }
    }
}

/// Everything [`crate::refine_plate`] needs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineParams {
    pub calibration: GridCalibration,
    pub hough: HoughParams,
    pub search: GridSearchParams,
}
