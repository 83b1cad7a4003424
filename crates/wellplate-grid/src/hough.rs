//! Circular Hough transform with gradient-direction voting.
//!
//! Edge pixels (Canny) vote along their Sobel gradient, in both directions,
//! for every radius in the search range. Accumulator peaks become center
//! candidates; each candidate gets the radius with the most edge support and
//! candidates closer than `min_dist` to a stronger circle are dropped.

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A detected circle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Accumulator votes at the center.
    pub votes: u32,
}

/// Absolute search window for one call of [`hough_circles`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleSearch {
    pub min_radius: u32,
    pub max_radius: u32,
    pub min_dist: f64,
    pub canny_low: f32,
    pub canny_high: f32,
    pub accumulator_threshold: u32,
}

/// Find circles in `gray`. Output is sorted by votes, strongest first.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip(gray, search),
        fields(width = gray.width(), height = gray.height())
    )
)]
pub fn hough_circles(gray: &GrayImage, search: &CircleSearch) -> Vec<Circle> {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 || search.max_radius < search.min_radius || search.max_radius == 0 {
        return Vec::new();
    }
    let (w, h) = (w as usize, h as usize);

    let edges = canny(gray, search.canny_low, search.canny_high);
    let gx = horizontal_sobel(gray);
    let gy = vertical_sobel(gray);
    let edge_raw = edges.as_raw();

    let mut acc = vec![0u32; w * h];
    for (idx, _) in edge_raw.iter().enumerate().filter(|(_, &e)| e > 0) {
        let gxv = gx.as_raw()[idx] as f32;
        let gyv = gy.as_raw()[idx] as f32;
        let mag = gxv.hypot(gyv);
        if mag < 1e-3 {
            continue;
        }
        let (dx, dy) = (gxv / mag, gyv / mag);
        let (x, y) = ((idx % w) as f32, (idx / w) as f32);

        for sign in [1.0f32, -1.0] {
            let mut last = usize::MAX;
            for r in search.min_radius..=search.max_radius {
                let cx = (x + sign * dx * r as f32).round();
                let cy = (y + sign * dy * r as f32).round();
                if cx < 0.0 || cy < 0.0 || cx >= w as f32 || cy >= h as f32 {
                    break;
                }
                let cidx = cy as usize * w + cx as usize;
                if cidx != last {
                    acc[cidx] += 1;
                    last = cidx;
                }
            }
        }
    }

    let mut peaks: Vec<(u32, usize)> = Vec::new();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let idx = y * w + x;
            let v = acc[idx];
            if v > search.accumulator_threshold
                && v > acc[idx - 1]
                && v >= acc[idx + 1]
                && v > acc[idx - w]
                && v >= acc[idx + w]
            {
                peaks.push((v, idx));
            }
        }
    }
    peaks.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let min_dist_sq = search.min_dist * search.min_dist;
    let mut circles: Vec<Circle> = Vec::new();
    for (votes, idx) in peaks {
        let (x, y) = (idx % w, idx / w);
        let too_close = circles.iter().any(|c| {
            let ddx = c.x as f64 - x as f64;
            let ddy = c.y as f64 - y as f64;
            ddx * ddx + ddy * ddy < min_dist_sq
        });
        if too_close {
            continue;
        }
        let Some((radius, support)) = best_radius(edge_raw, w, h, x, y, search) else {
            continue;
        };
        if support < search.accumulator_threshold {
            continue;
        }
        circles.push(Circle {
            x: x as f32,
            y: y as f32,
            radius,
            votes,
        });
    }
    log::trace!("hough: {} circles", circles.len());
    circles
}

/// Radius bin with the most edge pixels around `(cx, cy)`; ties keep the smaller radius.
fn best_radius(
    edges: &[u8],
    w: usize,
    h: usize,
    cx: usize,
    cy: usize,
    search: &CircleSearch,
) -> Option<(f32, u32)> {
    let r_max = search.max_radius as usize + 1;
    let bins = (search.max_radius - search.min_radius + 1) as usize;
    let mut hist = vec![0u32; bins];

    let y0 = cy.saturating_sub(r_max);
    let y1 = (cy + r_max).min(h - 1);
    let x0 = cx.saturating_sub(r_max);
    let x1 = (cx + r_max).min(w - 1);
    for y in y0..=y1 {
        for x in x0..=x1 {
            if edges[y * w + x] == 0 {
                continue;
            }
            let d = ((x as f64 - cx as f64).hypot(y as f64 - cy as f64)).round();
            if d < search.min_radius as f64 || d > search.max_radius as f64 {
                continue;
            }
            hist[d as usize - search.min_radius as usize] += 1;
        }
    }

    let (bin, &count) = hist
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))?;
    Some(((search.min_radius as usize + bin) as f32, count))
}
