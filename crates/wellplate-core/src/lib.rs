//! Core types for multi-well plate imaging.
//!
//! Geometry (`Affine2`, `Homography`), well addressing (`WellName`,
//! `PlateBox`), color samples (`Rgb`, `Hsv`) and a borrowed grayscale view.
//! Nothing here depends on a concrete image crate.

mod affine;
mod color;
mod homography;
mod image;
mod logger;
mod wells;

pub use affine::Affine2;
pub use color::{hsv_to_rgb_unit, rgb_to_hsv_u8, Hsv, Rgb, HUE_RANGE_U8};
pub use homography::{homography_from_4pt, Homography};
pub use image::GrayImageView;
pub use wells::{well_names, PlateBox, WellName, WellNameError, PLATE_COLS, PLATE_ROWS};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;

/// Refined per-plate grid: maps `(column, row)` well indices to pixels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WellGrid {
    pub transform: Affine2,
    pub plate: PlateBox,
}

impl WellGrid {
    /// Pixel position of `well`, in floating point.
    pub fn well_center(&self, well: WellName) -> nalgebra::Point2<f64> {
        self.transform.apply(well.grid_point())
    }

    /// Grid spacing along x in pixels.
    pub fn pitch(&self) -> f64 {
        self.transform.scale_x()
    }
}
