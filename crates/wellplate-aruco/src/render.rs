//! Marker rasterization for printing and synthetic test scenes.

use image::{GrayImage, Luma};
use nalgebra::Point2;
use wellplate_core::homography_from_4pt;

use crate::Dictionary;

/// Axis-aligned marker image with a one-bit black border, `cell_px` pixels per bit.
pub fn render_marker(dict: &Dictionary, id: u32, cell_px: u32) -> Option<GrayImage> {
    let n = dict.marker_size;
    let cells = (n + 2) as u32;
    let cell_px = cell_px.max(1);
    let side = cells * cell_px;
    dict.code(id)?;

    let mut img = GrayImage::new(side, side);
    for (x, y, px) in img.enumerate_pixels_mut() {
        let cx = (x / cell_px) as usize;
        let cy = (y / cell_px) as usize;
        *px = Luma([cell_value(dict, id, cx, cy)]);
    }
    Some(img)
}

/// Paint marker `id` into `img` so its corners land on `corners`
/// (top-left, top-right, bottom-right, bottom-left of the marker).
///
/// Returns `false` when the id is unknown or the quad is degenerate.
pub fn draw_marker(
    img: &mut GrayImage,
    dict: &Dictionary,
    id: u32,
    corners: &[Point2<f32>; 4],
) -> bool {
    if dict.code(id).is_none() {
        return false;
    }
    let cells = (dict.marker_size + 2) as f32;
    let canon = [
        Point2::new(0.0, 0.0),
        Point2::new(cells, 0.0),
        Point2::new(cells, cells),
        Point2::new(0.0, cells),
    ];
    let Some(img_to_marker) = homography_from_4pt(corners, &canon) else {
        return false;
    };

    let xs = corners.map(|p| p.x);
    let ys = corners.map(|p| p.y);
    let lo = |v: [f32; 4]| v.into_iter().fold(f32::INFINITY, f32::min).max(0.0) as u32;
    let hi = |v: [f32; 4]| v.into_iter().fold(0.0, f32::max).ceil() as u32;
    let (min_x, min_y) = (lo(xs), lo(ys));
    let (max_x, max_y) = (hi(xs).min(img.width()), hi(ys).min(img.height()));

    for y in min_y..max_y {
        for x in min_x..max_x {
            let m = img_to_marker.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
            if m.x < 0.0 || m.y < 0.0 || m.x >= cells || m.y >= cells {
                continue;
            }
            let v = cell_value(dict, id, m.x as usize, m.y as usize);
            img.put_pixel(x, y, Luma([v]));
        }
    }
    true
}

fn cell_value(dict: &Dictionary, id: u32, cx: usize, cy: usize) -> u8 {
    let n = dict.marker_size;
    if cx == 0 || cy == 0 || cx > n || cy > n {
        return 0;
    }
    match dict.is_white(id, cy - 1, cx - 1) {
        Some(true) => 255,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin_dictionary;

    #[test]
    fn rendered_marker_has_black_border_and_code_cells() {
        let dict = builtin_dictionary("DICT_4X4_50").expect("builtin");
        let img = render_marker(&dict, 0, 5).expect("known id");
        assert_eq!(img.dimensions(), (30, 30));
        assert_eq!(img.get_pixel(2, 2).0[0], 0);
        assert_eq!(img.get_pixel(27, 12).0[0], 0);
        // first code row is white, black, white, white
        assert_eq!(img.get_pixel(7, 7).0[0], 255);
        assert_eq!(img.get_pixel(12, 7).0[0], 0);
        assert_eq!(img.get_pixel(17, 7).0[0], 255);
        assert!(render_marker(&dict, 50, 5).is_none());
    }

    #[test]
    fn drawn_marker_matches_rendered_one() {
        let dict = builtin_dictionary("DICT_4X4_50").expect("builtin");
        let reference = render_marker(&dict, 4, 10).expect("known id");
        let mut canvas = GrayImage::from_pixel(60, 60, Luma([200]));
        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(60.0, 0.0),
            Point2::new(60.0, 60.0),
            Point2::new(0.0, 60.0),
        ];
        assert!(draw_marker(&mut canvas, &dict, 4, &corners));
        assert_eq!(canvas, reference);
    }
}
