//! Rough plate boxes from the deck template anchored at the fiducial.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use wellplate_core::{Affine2, PlateBox};

use crate::orient::MarkerCorners;

/// Deck template in marker units.
///
/// The marker frame has its origin at the marker's bottom-left corner, `x`
/// along the bottom edge and `y` along the left edge (towards the top-left
/// corner), one unit per marker side. The default values were measured by hand
/// for one deck and camera mount; they are rig data, not derived.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckCalibration {
    /// Position of slot 1 along `x`.
    pub x0: f64,
    /// Position of slot 1 along `y`.
    pub y0: f64,
    /// Slot pitch along `x`.
    pub xx: f64,
    /// Drift along `y` per slot column.
    pub xy: f64,
    /// Slot pitch along `y`.
    pub yy: f64,
    /// Drift along `x` per slot row.
    pub yx: f64,
    /// Inset of the plate box inside its slot along `x`.
    pub xp: f64,
    /// Inset of the plate box inside its slot along `y`.
    pub yp: f64,
    /// Slot columns, counted along `x`.
    pub columns: usize,
    /// Slot rows, counted along `y`.
    pub rows: usize,
    /// Slots without a plate (trash bin), 1-based.
    pub reserved_slots: Vec<usize>,
}

impl Default for DeckCalibration {
    fn default() -> Self {
        Self {
            x0: 1.1,
            y0: -0.12,
            xx: 1.85,
            xy: 0.04,
            yy: 1.27,
            yx: -0.01,
            xp: -0.08,
            yp: -0.05,
            columns: 3,
            rows: 4,
            reserved_slots: vec![12],
        }
    }
}

/// One deck position and its estimated plate box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSlot {
    /// 1-based, row-major over the template.
    pub slot: usize,
    pub plate: PlateBox,
}

/// Map from marker units to pixels.
pub fn marker_frame(marker: &MarkerCorners) -> Affine2 {
    let p = marker.map(|c| Point2::new(c.x as f64, c.y as f64));
    Affine2::from_frame(p[3], p[2] - p[3], p[0] - p[3])
}

/// Estimate the plate box of every non-reserved deck slot.
///
/// Box corners are projected from marker units and truncated to pixels; they
/// may lie outside the frame.
pub fn estimate_plates(marker: &MarkerCorners, deck: &DeckCalibration) -> Vec<DeckSlot> {
    let frame = marker_frame(marker);
    let mut out = Vec::with_capacity(deck.rows * deck.columns);
    for j in 0..deck.rows {
        for i in 0..deck.columns {
            let slot = j * deck.columns + i + 1;
            if deck.reserved_slots.contains(&slot) {
                continue;
            }
            let (fi, fj) = (i as f64, j as f64);
            let near = Point2::new(
                deck.x0 - deck.xp + deck.xx * fi + deck.yx * fj,
                deck.y0 - deck.yp + deck.yy * fj + deck.xy * fi,
            );
            let far = Point2::new(
                deck.x0 + deck.xp + deck.xx * (fi + 1.0) + deck.yx * (fj + 1.0),
                deck.y0 + deck.yp + deck.yy * (fj + 1.0) + deck.xy * (fi + 1.0),
            );
            let a = frame.apply(near);
            let b = frame.apply(far);
            out.push(DeckSlot {
                slot,
                plate: PlateBox::new(a.x as i32, a.y as i32, b.x as i32, b.y as i32),
            });
        }
    }
    out
}

/// Axis vectors of the marker frame in pixels, for drawing.
pub fn marker_axes(marker: &MarkerCorners) -> (Vector2<f64>, Vector2<f64>) {
    let f = marker_frame(marker);
    (
        Vector2::new(f.m[(0, 0)], f.m[(1, 0)]),
        Vector2::new(f.m[(0, 1)], f.m[(1, 1)]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upright(x: i32, bottom: i32, s: i32) -> MarkerCorners {
        [
            Point2::new(x, bottom - s),
            Point2::new(x + s, bottom - s),
            Point2::new(x + s, bottom),
            Point2::new(x, bottom),
        ]
    }

    fn near(a: i32, b: i32) -> bool {
        (a - b).abs() <= 1
    }

    #[test]
    fn default_deck_has_eleven_slots_without_the_trash() {
        let slots = estimate_plates(&upright(40, 560, 200), &DeckCalibration::default());
        assert_eq!(slots.len(), 11);
        let ids: Vec<usize> = slots.iter().map(|s| s.slot).collect();
        assert_eq!(ids, (1..=11).collect::<Vec<_>>());
    }

    #[test]
    fn first_slot_projects_from_the_marker_corner() {
        let slots = estimate_plates(&upright(40, 560, 200), &DeckCalibration::default());
        let b = slots[0].plate;
        // near corner (1.18, -0.07), far corner (2.86, 1.14) in marker units
        assert!(near(b.x1, 276) && near(b.y1, 574), "{b:?}");
        assert!(near(b.x2, 612) && near(b.y2, 332), "{b:?}");
    }

    #[test]
    fn slots_advance_right_then_up() {
        let slots = estimate_plates(&upright(40, 560, 200), &DeckCalibration::default());
        assert!(slots[1].plate.center().x > slots[0].plate.center().x + 300.0);
        assert!(slots[3].plate.center().y < slots[0].plate.center().y - 200.0);
    }

    #[test]
    fn reserved_slots_are_configurable() {
        let deck = DeckCalibration {
            reserved_slots: vec![],
            ..DeckCalibration::default()
        };
        assert_eq!(estimate_plates(&upright(0, 100, 20), &deck).len(), 12);
    }

    #[test]
    fn axes_follow_the_marker_edges() {
        let (ex, ey) = marker_axes(&upright(40, 560, 200));
        assert_eq!(ex, Vector2::new(200.0, 0.0));
        assert_eq!(ey, Vector2::new(0.0, -200.0));
    }
}
