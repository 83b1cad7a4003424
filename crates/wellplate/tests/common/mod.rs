#![allow(dead_code)]

use image::{GrayImage, Luma, Rgb, RgbImage};
use nalgebra::Point2;
use wellplate::aruco::{builtin_dictionary, draw_marker, DEFAULT_DICTIONARY};

pub const WIDTH: u32 = 700;
pub const HEIGHT: u32 = 600;
pub const BACKGROUND: u8 = 235;
pub const MARKER_ID: u32 = 5;

/// Marker corners: top-left, top-right, bottom-right, bottom-left.
pub const MARKER: [(f32, f32); 4] = [
    (40.0, 360.0),
    (240.0, 360.0),
    (240.0, 560.0),
    (40.0, 560.0),
];

/// Slot 1 lands near (276, 332)-(612, 574) for this marker; the plate is
/// centered in it.
pub const A1: (f32, f32) = (307.5, 365.5);
pub const PITCH: f32 = 25.0;
pub const WELL_RADIUS: f32 = 7.5;

/// Distinct, dark enough for circle detection, different in every row and column.
pub fn well_color(row: u32, col: u32) -> [u8; 3] {
    [
        (30 + 15 * row) as u8,
        (40 + 8 * col) as u8,
        (180 - 10 * row) as u8,
    ]
}

/// Upright deck: one marker at the bottom left and a 96-well plate in slot 1.
pub fn synthetic_deck() -> RgbImage {
    let dict = builtin_dictionary(DEFAULT_DICTIONARY).expect("builtin dictionary");
    let mut gray = GrayImage::from_pixel(WIDTH, HEIGHT, Luma([BACKGROUND]));
    let corners = MARKER.map(|(x, y)| Point2::new(x, y));
    assert!(draw_marker(&mut gray, &dict, MARKER_ID, &corners));

    let mut frame = RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    });
    for row in 0..8u32 {
        for col in 0..12u32 {
            let cx = A1.0 + PITCH * col as f32;
            let cy = A1.1 + PITCH * row as f32;
            let color = Rgb(well_color(row, col));
            let r = WELL_RADIUS.ceil() as i32;
            for dy in -r..=r {
                for dx in -r..=r {
                    let x = cx.floor() as i32 + dx;
                    let y = cy.floor() as i32 + dy;
                    let (px, py) = (x as f32 + 0.5 - cx, y as f32 + 0.5 - cy);
                    if px.hypot(py) <= WELL_RADIUS {
                        frame.put_pixel(x as u32, y as u32, color);
                    }
                }
            }
        }
    }
    frame
}

pub fn assert_color_near(got: [u8; 3], want: [u8; 3], tol: i32) {
    for k in 0..3 {
        let d = (got[k] as i32 - want[k] as i32).abs();
        assert!(d <= tol, "color {got:?} expected near {want:?}");
    }
}
