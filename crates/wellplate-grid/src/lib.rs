//! Well-grid refinement for multi-well plates.
//!
//! Given a rough plate box, [`refine_plate`] finds the well outlines with a
//! circular Hough transform, fits an axis-aligned lattice (origin and
//! per-axis pitch) to the circle centers by exhaustive search, rejects
//! outliers and returns the affine map from `(column, row)` to pixels.

mod hough;
mod optimize;
mod params;
mod refine;

pub use hough::{hough_circles, Circle, CircleSearch};
pub use optimize::{grid_error, lattice_residual, linspace, optimize_grid, GridFit};
pub use params::{GridCalibration, GridSearchParams, HoughParams, RefineParams};
pub use refine::{
    detect_plate_circles, expected_radius, fit_plate_grid, refine_plate, refine_plate_detailed,
    PlateRefinement,
};
