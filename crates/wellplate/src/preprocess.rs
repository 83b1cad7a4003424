//! Frame preparation: grayscale, canonical size, rotations.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp, Interpolation, Projection};
use serde::{Deserialize, Serialize};

/// Color frame from any decoded image; gray input is replicated.
pub fn to_rgb(image: &DynamicImage) -> RgbImage {
    match image {
        DynamicImage::ImageRgb8(rgb) => rgb.clone(),
        other => other.to_rgb8(),
    }
}

/// Luma of a color frame.
pub fn to_gray(frame: &RgbImage) -> GrayImage {
    imageops::grayscale(frame)
}

/// Resize and center-crop `image` to `shape = (rows, cols)`.
///
/// The aspect-preserving factor makes one axis match exactly and the other
/// axis is cropped symmetrically (the odd pixel comes off the far side). If
/// the result is transposed relative to `shape` it is turned 90 degrees
/// counter-clockwise.
pub fn match_size(image: &RgbImage, shape: (u32, u32)) -> RgbImage {
    let (h, w) = (image.height(), image.width());
    if h == 0 || w == 0 || shape.0 == 0 || shape.1 == 0 {
        return image.clone();
    }
    let (min_img, max_img) = (h.min(w) as f64, h.max(w) as f64);
    let (min_out, max_out) = (shape.0.min(shape.1), shape.0.max(shape.1));

    let ar_img = max_img / min_img;
    let ar_out = max_out as f64 / min_out as f64;
    let (factor, matched, cropped) = if ar_img >= ar_out {
        (min_out as f64 / min_img, min_out, max_out)
    } else {
        (max_out as f64 / max_img, max_out, min_out)
    };

    let nw = ((w as f64 * factor).round() as u32).max(1);
    let nh = ((h as f64 * factor).round() as u32).max(1);
    let resized = imageops::resize(image, nw, nh, FilterType::Triangle);

    let out = if nh == matched {
        let diff = nw.saturating_sub(cropped);
        imageops::crop_imm(&resized, diff / 2, 0, nw - diff, nh).to_image()
    } else {
        let diff = nh.saturating_sub(cropped);
        imageops::crop_imm(&resized, 0, diff / 2, nw, nh - diff).to_image()
    };

    if (out.height(), out.width()) != shape {
        imageops::rotate270(&out)
    } else {
        out
    }
}

/// Rotate about the image center by `angle_deg`, counter-clockwise on screen.
///
/// The output keeps the input size; uncovered pixels are black.
pub fn rotate_degrees(image: &RgbImage, angle_deg: f64) -> RgbImage {
    if angle_deg == 0.0 {
        return image.clone();
    }
    let (cx, cy) = (image.width() as f64 / 2.0, image.height() as f64 / 2.0);
    let (b, a) = angle_deg.to_radians().sin_cos();
    let m = [
        a,
        b,
        (1.0 - a) * cx - b * cy,
        -b,
        a,
        b * cx + (1.0 - a) * cy,
        0.0,
        0.0,
        1.0,
    ];
    let Some(projection) = Projection::from_matrix(m.map(|v| v as f32)) else {
        return image.clone();
    };
    warp(image, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]))
}

/// Lossless rotation by a multiple of 90 degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarterTurn {
    #[default]
    None,
    Clockwise,
    CounterClockwise,
    Half,
}

impl QuarterTurn {
    pub fn apply(self, image: &RgbImage) -> RgbImage {
        match self {
            QuarterTurn::None => image.clone(),
            QuarterTurn::Clockwise => imageops::rotate90(image),
            QuarterTurn::CounterClockwise => imageops::rotate270(image),
            QuarterTurn::Half => imageops::rotate180(image),
        }
    }
}
