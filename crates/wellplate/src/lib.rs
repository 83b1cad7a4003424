//! Well colors from a single deck photograph.
//!
//! This crate ties the workspace together:
//! - re-exports of the core, marker and grid crates,
//! - frame preprocessing (`to_gray`, `match_size`, rotations),
//! - fiducial orientation (`orient`, `refine_angle`),
//! - deck layout (`estimate_plates`),
//! - well sampling (`find_wells`, `get_well_color`, `measure_well_in_grid`),
//! - frame drivers (`get_colors`, `measure_well`) and a JSON config.
//!
//! ## Quickstart
//!
//! ```no_run
//! use wellplate::{get_colors, match_size, PipelineConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let frame = image::open("deck.png")?.to_rgb8();
//! let frame = match_size(&frame, (1280, 1920));
//! let report = get_colors(&frame, &PipelineConfig::default())?;
//! if let Some(slot) = report.most_central() {
//!     println!("slot {slot}: A1 = {:?}", report.color(slot, "A1"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Conventions
//! - Marker corners are top-left, top-right, bottom-right, bottom-left of the
//!   marker itself. Only the largest marker is used.
//! - Deck slots are numbered from 1; the trash slot is never reported.
//! - Colors are RGB; [`Rgb::bgr`] gives blue-green-red order.

pub use wellplate_aruco as aruco;
pub use wellplate_core as core;
pub use wellplate_grid as grid;

pub use wellplate_core::{Affine2, Hsv, PlateBox, Rgb, WellGrid, WellName};

mod config;
pub mod debug;
mod error;
mod layout;
mod orient;
mod pipeline;
mod preprocess;
mod sampler;

pub use config::PipelineConfig;
pub use debug::{DebugSink, ImageDumpSink, NoopSink};
pub use error::{ConfigError, PipelineError};
pub use layout::{estimate_plates, marker_axes, marker_frame, DeckCalibration, DeckSlot};
pub use orient::{
    bottom_edge_angle, dominant_marker, orient, quarter_turn_for, refine_angle, residual_angle,
    MarkerCorners, Oriented,
};
pub use pipeline::{
    get_colors, get_colors_with_sink, measure_well, measure_well_with_sink, proximity, scan_deck,
    ColorReport, DeckScan, PlateColors, RefinedPlate,
};
pub use preprocess::{match_size, rotate_degrees, to_gray, to_rgb, QuarterTurn};
pub use sampler::{find_wells, get_well_color, measure_well_in_grid, SamplerParams, WellReading};
