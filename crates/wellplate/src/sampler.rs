//! Well positions and color reads.

use std::collections::BTreeMap;

use image::imageops::{self, FilterType};
use image::RgbImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use wellplate_core::{rgb_to_hsv_u8, well_names, Affine2, Hsv, Rgb, WellGrid, WellName};

/// Settings of the single-well neighborhood sampler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerParams {
    /// Frames are resized to this working resolution before sampling.
    pub working_width: u32,
    pub working_height: u32,
    /// Sampling radius is the well pitch divided by this.
    pub neighborhood_divisor: f64,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            working_width: 640,
            working_height: 480,
            neighborhood_divisor: 3.0,
        }
    }
}

/// Median color of one well, in both color spaces.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellReading {
    pub rgb: Rgb,
    /// Each channel normalized to `[0, 1]`.
    pub hsv: Hsv,
}

/// Pixel position of every well of a `rows` x `cols` plate.
///
/// Positions are truncated and not checked against any image.
pub fn find_wells(
    transform: &Affine2,
    rows: usize,
    cols: usize,
) -> BTreeMap<WellName, Point2<i32>> {
    well_names(rows, cols)
        .into_iter()
        .map(|w| {
            let p = transform.apply(w.grid_point());
            (w, Point2::new(p.x as i32, p.y as i32))
        })
        .collect()
}

/// Single-pixel color read; `None` outside the image.
pub fn get_well_color(image: &RgbImage, p: Point2<i32>) -> Option<Rgb> {
    let (x, y) = (u32::try_from(p.x).ok()?, u32::try_from(p.y).ok()?);
    if x >= image.width() || y >= image.height() {
        return None;
    }
    Some(Rgb(image.get_pixel(x, y).0))
}

/// Median of a channel; the mean of the two middle values for even counts.
fn median(values: &mut [u8]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let n = values.len();
    let mid = values[n / 2] as f64;
    Some(if n % 2 == 0 {
        (values[n / 2 - 1] as f64 + mid) / 2.0
    } else {
        mid
    })
}

/// Per-channel HSV median over a disk around `well`.
///
/// The frame is resized to the working resolution first and the disk radius
/// is the grid pitch, scaled the same way, over `neighborhood_divisor`.
/// `None` when the disk has no pixel inside the frame.
pub fn measure_well_in_grid(
    frame: &RgbImage,
    grid: &WellGrid,
    well: WellName,
    params: &SamplerParams,
) -> Option<WellReading> {
    if frame.width() == 0 || frame.height() == 0 {
        return None;
    }
    let (ww, wh) = (params.working_width.max(1), params.working_height.max(1));
    let fx = ww as f64 / frame.width() as f64;
    let fy = wh as f64 / frame.height() as f64;
    let work = imageops::resize(frame, ww, wh, FilterType::Triangle);

    let c = grid.well_center(well);
    let (cx, cy) = (c.x * fx, c.y * fy);
    let r = grid.pitch().abs() * fx / params.neighborhood_divisor;
    let r2 = r * r;

    let x0 = (cx - r).floor().max(0.0) as i64;
    let x1 = ((cx + r).ceil() as i64).min(ww as i64 - 1);
    let y0 = (cy - r).floor().max(0.0) as i64;
    let y1 = ((cy + r).ceil() as i64).min(wh as i64 - 1);

    let mut hs = Vec::new();
    let mut ss = Vec::new();
    let mut vs = Vec::new();
    for y in y0..=y1 {
        for x in x0..=x1 {
            let (dx, dy) = (x as f64 - cx, y as f64 - cy);
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let [h, s, v] = rgb_to_hsv_u8(Rgb(work.get_pixel(x as u32, y as u32).0));
            hs.push(h);
            ss.push(s);
            vs.push(v);
        }
    }
    log::trace!("well {well}: {} samples, radius {r:.2}", hs.len());

    let h = median(&mut hs)?;
    let s = median(&mut ss)?;
    let v = median(&mut vs)?;
    let hsv = Hsv {
        h: h / wellplate_core::HUE_RANGE_U8,
        s: s / 255.0,
        v: v / 255.0,
    };
    Some(WellReading {
        rgb: hsv.to_rgb(),
        hsv,
    })
}
