//! Stage-by-stage visual diagnostics.
//!
//! The pipeline reports intermediate results to a [`DebugSink`]. The default
//! [`NoopSink`] ignores them; [`ImageDumpSink`] draws them onto copies of the
//! frame and writes PNG files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut};
use nalgebra::Point2;
use wellplate_aruco::Fiducial;
use wellplate_core::{PlateBox, WellGrid, WellName};
use wellplate_grid::PlateRefinement;

use crate::layout::{marker_axes, DeckSlot};
use crate::orient::MarkerCorners;

const MAGENTA: Rgb<u8> = Rgb([255, 0, 255]);
const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const GRAY: Rgb<u8> = Rgb([50, 50, 50]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Receiver of intermediate pipeline results. Every method defaults to a no-op.
pub trait DebugSink {
    /// All markers found on the input frame.
    fn fiducials(&mut self, _frame: &RgbImage, _fiducials: &[Fiducial]) {}

    /// Frame after rotation correction, with the re-detected marker.
    fn oriented(&mut self, _image: &RgbImage, _marker: &MarkerCorners) {}

    /// Estimated plate boxes on the oriented frame.
    fn plates(&mut self, _image: &RgbImage, _slots: &[DeckSlot]) {}

    /// Circles and lattice of one refined plate.
    fn refinement(&mut self, _image: &RgbImage, _slot: usize, _refinement: &PlateRefinement) {}

    /// Final well positions of one plate.
    fn wells(
        &mut self,
        _image: &RgbImage,
        _slot: usize,
        _grid: &WellGrid,
        _wells: &BTreeMap<WellName, Point2<i32>>,
    ) {
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl DebugSink for NoopSink {}

/// Writes annotated PNGs into a directory.
///
/// Level 1 writes the final wells of each plate; level 2 and above also
/// writes markers, the oriented frame, plate boxes and circle fits.
#[derive(Debug)]
pub struct ImageDumpSink {
    dir: PathBuf,
    level: u8,
    written: Vec<PathBuf>,
}

impl ImageDumpSink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>, level: u8) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            level,
            written: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn save(&mut self, name: &str, image: &RgbImage) {
        let path = self.dir.join(name);
        match image.save(&path) {
            Ok(()) => {
                log::debug!("wrote {}", path.display());
                self.written.push(path);
            }
            Err(e) => log::warn!("failed to write {}: {e}", path.display()),
        }
    }
}

fn to_f32(p: Point2<i32>) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

fn draw_quad(img: &mut RgbImage, q: &[(f32, f32); 4], color: Rgb<u8>) {
    for k in 0..4 {
        draw_line_segment_mut(img, q[k], q[(k + 1) % 4], color);
    }
}

fn draw_box(img: &mut RgbImage, b: &PlateBox, color: Rgb<u8>) {
    let (x1, y1, x2, y2) = (b.x1 as f32, b.y1 as f32, b.x2 as f32, b.y2 as f32);
    draw_quad(img, &[(x1, y1), (x2, y1), (x2, y2), (x1, y2)], color);
    draw_line_segment_mut(img, (x1, y1), (x2, y2), color);
    draw_line_segment_mut(img, (x2, y1), (x1, y2), color);
}

impl DebugSink for ImageDumpSink {
    fn fiducials(&mut self, frame: &RgbImage, fiducials: &[Fiducial]) {
        if self.level < 2 {
            return;
        }
        let mut img = frame.clone();
        for f in fiducials {
            let q = f.corners.map(|c| (c.x, c.y));
            draw_quad(&mut img, &q, WHITE);
            // corner 0 marks the marker's own top-left
            draw_hollow_circle_mut(&mut img, (q[0].0 as i32, q[0].1 as i32), 4, MAGENTA);
        }
        self.save("01_fiducials.png", &img);
    }

    fn oriented(&mut self, image: &RgbImage, marker: &MarkerCorners) {
        if self.level < 2 {
            return;
        }
        let mut img = image.clone();
        draw_quad(&mut img, &marker.map(to_f32), WHITE);
        let (ex, ey) = marker_axes(marker);
        let o = to_f32(marker[3]);
        draw_line_segment_mut(&mut img, o, (o.0 + ex.x as f32, o.1 + ex.y as f32), MAGENTA);
        draw_line_segment_mut(&mut img, o, (o.0 + ey.x as f32, o.1 + ey.y as f32), GREEN);
        self.save("02_oriented.png", &img);
    }

    fn plates(&mut self, image: &RgbImage, slots: &[DeckSlot]) {
        if self.level < 2 {
            return;
        }
        let mut img = image.clone();
        for s in slots {
            draw_box(&mut img, &s.plate, MAGENTA);
        }
        self.save("03_plates.png", &img);
    }

    fn refinement(&mut self, image: &RgbImage, slot: usize, r: &PlateRefinement) {
        if self.level < 2 {
            return;
        }
        let mut img = image.clone();
        let t = &r.grid.transform;
        let b = &r.grid.plate;
        // lattice lines across the plate box
        let (x_range, y_range) = (
            b.min_x() as f64..=b.max_x() as f64,
            b.min_y() as f64..=b.max_y() as f64,
        );
        for k in -1..=40 {
            let p = t.apply(Point2::new(k as f64, k as f64));
            if x_range.contains(&p.x) {
                let x = p.x as f32;
                draw_line_segment_mut(&mut img, (x, b.min_y() as f32), (x, b.max_y() as f32), GRAY);
            }
            if y_range.contains(&p.y) {
                let y = p.y as f32;
                draw_line_segment_mut(&mut img, (b.min_x() as f32, y), (b.max_x() as f32, y), GRAY);
            }
        }
        let radius = (r.fit.scale_x / 3.0).max(1.0) as i32;
        for (c, &inlier) in r.centers.iter().zip(&r.inliers) {
            let color = if inlier { MAGENTA } else { GRAY };
            draw_hollow_circle_mut(&mut img, (c.x as i32, c.y as i32), radius, color);
        }
        self.save(&format!("04_slot{slot:02}_circles.png"), &img);
    }

    fn wells(
        &mut self,
        image: &RgbImage,
        slot: usize,
        grid: &WellGrid,
        wells: &BTreeMap<WellName, Point2<i32>>,
    ) {
        if self.level < 1 {
            return;
        }
        let mut img = image.clone();
        let radius = (grid.pitch().abs() / 2.0).max(1.0) as i32;
        for p in wells.values() {
            let (Ok(x), Ok(y)) = (u32::try_from(p.x), u32::try_from(p.y)) else {
                continue;
            };
            if x >= image.width() || y >= image.height() {
                continue;
            }
            let color = *image.get_pixel(x, y);
            draw_filled_circle_mut(&mut img, (p.x, p.y), radius, color);
            draw_hollow_circle_mut(&mut img, (p.x, p.y), radius, WHITE);
        }
        self.save(&format!("05_slot{slot:02}_wells.png"), &img);
    }
}
