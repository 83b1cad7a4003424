//! Bit sampling inside a candidate quad.

use nalgebra::Point2;
use wellplate_core::{homography_from_4pt, GrayImageView};

use crate::threshold::otsu_threshold_from_samples;
use crate::{Match, Matcher};

/// Canonical side of the sampling square, in abstract units.
const CANON_SIDE: f32 = 100.0;
/// Sub-samples per cell side.
const SUBDIV: usize = 3;

/// Decoded candidate before corner reordering.
#[derive(Clone, Copy, Debug)]
pub(crate) struct QuadCode {
    pub code: u64,
    pub border_score: f32,
    pub matched: Match,
}

/// Sample points for a `cells x cells` grid over the canonical square.
///
/// Each cell gets `SUBDIV^2` points spread over its central part, so a cell
/// value is robust to blur at the cell boundaries.
struct SampleGrid {
    cells: usize,
    points: Vec<Point2<f32>>, // cell-major: (cy * cells + cx) * SUBDIV^2 + k
}

impl SampleGrid {
    fn new(cells: usize, cell_margin: f32) -> Self {
        let step = CANON_SIDE / cells as f32;
        let margin = cell_margin.clamp(0.0, 0.45) * step;
        let inner = step - 2.0 * margin;
        let sub = inner / SUBDIV as f32;

        let mut points = Vec::with_capacity(cells * cells * SUBDIV * SUBDIV);
        for cy in 0..cells {
            for cx in 0..cells {
                for sy in 0..SUBDIV {
                    for sx in 0..SUBDIV {
                        points.push(Point2::new(
                            cx as f32 * step + margin + (sx as f32 + 0.5) * sub,
                            cy as f32 * step + margin + (sy as f32 + 0.5) * sub,
                        ));
                    }
                }
            }
        }
        Self { cells, points }
    }
}

/// Reads the bit pattern of one quad and matches it against the dictionary.
pub(crate) struct QuadDecoder<'m> {
    matcher: &'m Matcher,
    border_bits: usize,
    min_border_score: f32,
    grid: SampleGrid,
    scratch: Vec<u8>,
}

impl<'m> QuadDecoder<'m> {
    pub fn new(
        matcher: &'m Matcher,
        border_bits: usize,
        cell_margin: f32,
        min_border_score: f32,
    ) -> Self {
        let cells = matcher.dictionary().marker_size + 2 * border_bits;
        Self {
            matcher,
            border_bits,
            min_border_score,
            grid: SampleGrid::new(cells, cell_margin),
            scratch: Vec::new(),
        }
    }

    /// Decode the marker inside `quad` (clockwise, any starting corner).
    pub fn decode(&mut self, img: &GrayImageView<'_>, quad: &[Point2<f32>; 4]) -> Option<QuadCode> {
        let canon = [
            Point2::new(0.0, 0.0),
            Point2::new(CANON_SIDE, 0.0),
            Point2::new(CANON_SIDE, CANON_SIDE),
            Point2::new(0.0, CANON_SIDE),
        ];
        let h = homography_from_4pt(&canon, quad)?;

        let per_cell = SUBDIV * SUBDIV;
        let cells = self.grid.cells;
        self.scratch.clear();
        for chunk in self.grid.points.chunks(per_cell) {
            let mut sum = 0u32;
            for p in chunk {
                let q = h.apply(*p);
                let (x, y) = (q.x.floor() as i32, q.y.floor() as i32);
                if !img.contains(x, y) {
                    return None;
                }
                sum += img.get(x, y) as u32;
            }
            self.scratch.push((sum / per_cell as u32) as u8);
        }

        let thr = otsu_threshold_from_samples(&self.scratch);
        let bits = self.matcher.dictionary().marker_size;
        let border = self.border_bits;

        let mut code = 0u64;
        let mut border_dark = 0u32;
        let mut border_total = 0u32;
        for cy in 0..cells {
            for cx in 0..cells {
                let white = self.scratch[cy * cells + cx] > thr;
                let on_border =
                    cx < border || cy < border || cx >= cells - border || cy >= cells - border;
                if on_border {
                    border_total += 1;
                    border_dark += (!white) as u32;
                } else if white {
                    code |= 1u64 << ((cy - border) * bits + (cx - border));
                }
            }
        }

        let border_score = if border_total > 0 {
            border_dark as f32 / border_total as f32
        } else {
            1.0
        };
        if border_score < self.min_border_score {
            return None;
        }

        let matched = self.matcher.match_code(code)?;
        Some(QuadCode {
            code,
            border_score,
            matched,
        })
    }
}

/// Reorder a clockwise quad so index 0 is the marker's own top-left corner.
pub(crate) fn marker_corners(quad: &[Point2<f32>; 4], rotation: u8) -> [Point2<f32>; 4] {
    let r = (rotation & 3) as usize;
    std::array::from_fn(|i| quad[(i + r) % 4])
}
