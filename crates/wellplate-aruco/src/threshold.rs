//! Binarization for marker candidates and bit sampling.

use image::{GrayImage, Luma};
use imageproc::filter::box_filter;

/// Local-mean threshold: pixels at least `c` below the mean of their
/// `(2r+1)^2` window become foreground (255), everything else 0.
///
/// Dark marker borders therefore show up as foreground blobs.
pub fn adaptive_threshold_inv(gray: &GrayImage, radius: u32, c: i16) -> GrayImage {
    let mean = box_filter(gray, radius, radius);
    let mut out = GrayImage::new(gray.width(), gray.height());
    for ((o, p), m) in out.pixels_mut().zip(gray.pixels()).zip(mean.pixels()) {
        let fg = (p.0[0] as i16) <= m.0[0] as i16 - c;
        *o = Luma([if fg { 255 } else { 0 }]);
    }
    out
}

/// Otsu threshold of a sample set; degenerate histograms fall back to the midpoint.
pub(crate) fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    let Some((&lo, &hi)) = samples.iter().min().zip(samples.iter().max()) else {
        return 127;
    };
    if lo == hi {
        return lo;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    if hist.iter().filter(|&&h| h > 0).count() <= 2 {
        return ((lo as u16 + hi as u16) / 2) as u8;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }
        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }
    best_t
}
