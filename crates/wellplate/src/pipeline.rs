//! Frame-level drivers: orient once, then refine and sample every plate.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use wellplate_aruco::{builtin_dictionary, detect_fiducials_gray};
use wellplate_core::{PlateBox, Rgb, WellGrid, WellName};
use wellplate_grid::refine_plate_detailed;

use crate::config::PipelineConfig;
use crate::debug::{DebugSink, NoopSink};
use crate::layout::estimate_plates;
use crate::orient::{dominant_marker, refine_angle, MarkerCorners};
use crate::preprocess::to_gray;
use crate::sampler::{find_wells, get_well_color, measure_well_in_grid, WellReading};
use crate::{ConfigError, PipelineError};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Colors of one plate plus its distance to the frame center.
///
/// Serializes as a flat object: `{"A1": [r, g, b], ..., "proximity": 0.12}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlateColors {
    #[serde(flatten)]
    pub wells: BTreeMap<WellName, Rgb>,
    pub proximity: f64,
}

/// Per-slot plate colors of one frame. Slots that were skipped are absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorReport {
    pub plates: BTreeMap<usize, PlateColors>,
}

impl ColorReport {
    pub fn get(&self, slot: usize) -> Option<&PlateColors> {
        self.plates.get(&slot)
    }

    /// Color of `well` on deck slot `slot`.
    pub fn color(&self, slot: usize, well: &str) -> Option<Rgb> {
        let w: WellName = well.parse().ok()?;
        self.plates.get(&slot)?.wells.get(&w).copied()
    }

    /// Slot whose plate is closest to the frame center.
    pub fn most_central(&self) -> Option<usize> {
        self.plates
            .iter()
            .min_by(|a, b| a.1.proximity.total_cmp(&b.1.proximity))
            .map(|(&slot, _)| slot)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// A plate whose well grid was refined.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefinedPlate {
    pub slot: usize,
    pub grid: WellGrid,
    pub proximity: f64,
}

/// Oriented frame and every plate that could be refined on it.
#[derive(Clone, Debug)]
pub struct DeckScan {
    pub image: RgbImage,
    pub marker: MarkerCorners,
    pub plates: Vec<RefinedPlate>,
}

/// Distance from the plate box center to the image center.
///
/// Both offsets are divided by the image width.
pub fn proximity(plate: &PlateBox, width: u32, height: u32) -> f64 {
    let c = plate.center();
    let w = width as f64;
    let dx = (c.x - w / 2.0).abs() / w;
    let dy = (c.y - height as f64 / 2.0).abs() / w;
    dx.hypot(dy)
}

/// Orient the frame and refine every in-frame plate.
///
/// Fails when the frame is empty or has no marker, or when the configured
/// marker dictionary is unknown. Plates outside the frame or without a well
/// grid are left out.
pub fn scan_deck(
    frame: &RgbImage,
    config: &PipelineConfig,
    sink: &mut dyn DebugSink,
) -> Result<DeckScan, PipelineError> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(PipelineError::EmptyImage { width, height });
    }
    if builtin_dictionary(&config.fiducial.dictionary).is_none() {
        let name = config.fiducial.dictionary.clone();
        return Err(PipelineError::UnknownDictionary(name));
    }

    let fiducials = detect_fiducials_gray(&to_gray(frame), &config.fiducial);
    sink.fiducials(frame, &fiducials);
    let marker = dominant_marker(&fiducials).ok_or(PipelineError::NoFiducial)?;
    if fiducials.len() > 1 {
        log::debug!("{} markers, orienting on the largest", fiducials.len());
    }

    let oriented = refine_angle(frame, &marker, &config.fiducial)?;
    sink.oriented(&oriented.image, &oriented.marker);

    let slots = estimate_plates(&oriented.marker, &config.deck);
    sink.plates(&oriented.image, &slots);

    let gray = to_gray(&oriented.image);
    let (w, h) = oriented.image.dimensions();
    let mut plates = Vec::with_capacity(slots.len());
    for s in &slots {
        if !s.plate.inside_image(w, h) {
            log::debug!(
                "slot {}: plate box {:?} leaves the {w}x{h} frame",
                s.slot,
                s.plate
            );
            continue;
        }
        let Some(r) = refine_plate_detailed(&gray, &s.plate, &config.refine) else {
            log::warn!("slot {}: no well grid found, plate skipped", s.slot);
            continue;
        };
        sink.refinement(&oriented.image, s.slot, &r);
        plates.push(RefinedPlate {
            slot: s.slot,
            grid: r.grid,
            proximity: proximity(&s.plate, w, h),
        });
    }
    log::info!("{} of {} deck slots refined", plates.len(), slots.len());

    Ok(DeckScan {
        image: oriented.image,
        marker: oriented.marker,
        plates,
    })
}

/// Single-pixel well colors for every refined plate of `frame`.
pub fn get_colors(frame: &RgbImage, config: &PipelineConfig) -> Result<ColorReport, PipelineError> {
    get_colors_with_sink(frame, config, &mut NoopSink)
}

/// [`get_colors`] reporting intermediate results to `sink`.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(frame, config, sink),
        fields(width = frame.width(), height = frame.height())
    )
)]
pub fn get_colors_with_sink(
    frame: &RgbImage,
    config: &PipelineConfig,
    sink: &mut dyn DebugSink,
) -> Result<ColorReport, PipelineError> {
    let scan = scan_deck(frame, config, sink)?;
    let mut report = ColorReport::default();
    for p in &scan.plates {
        let positions = find_wells(&p.grid.transform, config.plate_rows(), config.plate_cols());
        sink.wells(&scan.image, p.slot, &p.grid, &positions);

        let wells: BTreeMap<WellName, Rgb> = positions
            .iter()
            .filter_map(|(&w, &pt)| get_well_color(&scan.image, pt).map(|c| (w, c)))
            .collect();
        if wells.len() < positions.len() {
            log::debug!(
                "slot {}: {} wells fall outside the frame",
                p.slot,
                positions.len() - wells.len()
            );
        }
        report.plates.insert(
            p.slot,
            PlateColors {
                wells,
                proximity: p.proximity,
            },
        );
    }
    Ok(report)
}

/// Median color of one well, for live measurement.
///
/// `slot` picks the deck slot; without it the plate closest to the frame
/// center is used.
pub fn measure_well(
    frame: &RgbImage,
    well: &str,
    slot: Option<usize>,
    config: &PipelineConfig,
) -> Result<WellReading, PipelineError> {
    measure_well_with_sink(frame, well, slot, config, &mut NoopSink)
}

/// [`measure_well`] reporting intermediate results to `sink`.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(frame, config, sink),
        fields(width = frame.width(), height = frame.height())
    )
)]
pub fn measure_well_with_sink(
    frame: &RgbImage,
    well: &str,
    slot: Option<usize>,
    config: &PipelineConfig,
    sink: &mut dyn DebugSink,
) -> Result<WellReading, PipelineError> {
    let name: WellName = well
        .parse()
        .map_err(|_| PipelineError::UnknownWell(well.to_string()))?;
    let (rows, cols) = (config.plate_rows(), config.plate_cols());
    if !name.fits(rows, cols) {
        return Err(PipelineError::UnknownWell(well.to_string()));
    }

    let scan = scan_deck(frame, config, sink)?;
    let plate = match slot {
        Some(s) => scan
            .plates
            .iter()
            .find(|p| p.slot == s)
            .ok_or(PipelineError::PlateNotFound { slot: s })?,
        None => scan
            .plates
            .iter()
            .min_by(|a, b| a.proximity.total_cmp(&b.proximity))
            .ok_or(PipelineError::NoPlates)?,
    };

    let positions = find_wells(&plate.grid.transform, rows, cols);
    sink.wells(&scan.image, plate.slot, &plate.grid, &positions);

    let reading = measure_well_in_grid(&scan.image, &plate.grid, name, &config.sampler)
        .ok_or_else(|| PipelineError::WellOutOfFrame {
            well: name.to_string(),
        })?;
    log::info!(
        "slot {} well {name}: rgb {:?}, hsv ({:.3}, {:.3}, {:.3})",
        plate.slot,
        reading.rgb.0,
        reading.hsv.h,
        reading.hsv.s,
        reading.hsv.v
    );
    Ok(reading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn centered_plate_has_zero_proximity() {
        assert_relative_eq!(proximity(&PlateBox::new(100, 50, 300, 250), 400, 300), 0.0);
    }

    #[test]
    fn proximity_divides_both_axes_by_width() {
        // center (300, 250) in a 400x300 frame: offsets (100, 100) / 400
        let p = proximity(&PlateBox::new(200, 200, 400, 300), 400, 300);
        assert_relative_eq!(p, (0.25f64).hypot(0.25), epsilon = 1e-12);
    }

    #[test]
    fn report_serializes_flat_with_proximity_key() {
        let mut wells = BTreeMap::new();
        wells.insert(WellName::new(0, 0), Rgb::new(215, 163, 161));
        wells.insert(WellName::new(0, 1), Rgb::new(1, 2, 3));
        let mut report = ColorReport::default();
        report.plates.insert(
            1,
            PlateColors {
                wells,
                proximity: 0.5,
            },
        );

        let v = serde_json::to_value(&report).expect("serialize");
        assert_eq!(v["1"]["A1"], serde_json::json!([215, 163, 161]));
        assert_eq!(v["1"]["proximity"], serde_json::json!(0.5));

        let back: ColorReport = serde_json::from_value(v).expect("deserialize");
        assert_eq!(back, report);
        assert_eq!(back.color(1, "A2"), Some(Rgb::new(1, 2, 3)));
        assert_eq!(back.most_central(), Some(1));
    }

    #[test]
    fn empty_frame_is_rejected() {
        let err = get_colors(&RgbImage::new(0, 0), &PipelineConfig::default()).expect_err("empty");
        assert_eq!(
            err,
            PipelineError::EmptyImage {
                width: 0,
                height: 0
            }
        );
    }

    #[test]
    fn unknown_dictionary_is_reported() {
        let mut cfg = PipelineConfig::default();
        cfg.fiducial.dictionary = "DICT_5X5_100".into();
        let frame = RgbImage::from_pixel(64, 48, image::Rgb([128, 128, 128]));
        let err = get_colors(&frame, &cfg).expect_err("unknown dictionary");
        assert_eq!(err, PipelineError::UnknownDictionary("DICT_5X5_100".into()));
    }

    #[test]
    fn blank_frame_has_no_fiducial() {
        let frame = RgbImage::from_pixel(160, 120, image::Rgb([128, 128, 128]));
        let err = get_colors(&frame, &PipelineConfig::default()).expect_err("no marker");
        assert_eq!(err, PipelineError::NoFiducial);
    }

    #[test]
    fn bad_well_names_fail_before_any_detection() {
        let frame = RgbImage::new(0, 0);
        let cfg = PipelineConfig::default();
        for w in ["", "Z1", "A13", "I1", "1A"] {
            assert_eq!(
                measure_well(&frame, w, None, &cfg),
                Err(PipelineError::UnknownWell(w.to_string()))
            );
        }
    }
}
