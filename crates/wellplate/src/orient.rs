//! Dominant-marker selection and rotation correction.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use image::RgbImage;
use nalgebra::Point2;
use wellplate_aruco::{detect_fiducials_gray, Fiducial, FiducialParams};

use crate::preprocess::{rotate_degrees, to_gray, QuarterTurn};
use crate::PipelineError;

/// Marker corners truncated to pixels: top-left, top-right, bottom-right,
/// bottom-left of the marker.
pub type MarkerCorners = [Point2<i32>; 4];

/// Corners of the marker with the longest corner-0 to corner-2 diagonal.
///
/// Corners are truncated to pixels before the diagonals are compared, so
/// markers of the same pixel size tie exactly and the first one wins. Other
/// markers are ignored.
pub fn dominant_marker(fiducials: &[Fiducial]) -> Option<MarkerCorners> {
    let mut best: Option<(MarkerCorners, f64)> = None;
    for f in fiducials {
        let m = f.corners.map(|c| Point2::new(c.x as i32, c.y as i32));
        let d = marker_diagonal(&m);
        if best.is_none_or(|(_, b)| d > b) {
            best = Some((m, d));
        }
    }
    best.map(|(m, _)| m)
}

fn marker_diagonal(marker: &MarkerCorners) -> f64 {
    let d = marker[0] - marker[2];
    (d.x as f64).hypot(d.y as f64)
}

/// Detect markers in `frame` and return the dominant one.
pub fn orient(frame: &RgbImage, params: &FiducialParams) -> Result<MarkerCorners, PipelineError> {
    let fiducials = detect_fiducials_gray(&to_gray(frame), params);
    dominant_marker(&fiducials).ok_or(PipelineError::NoFiducial)
}

/// Angle of the marker's bottom edge (bottom-left to bottom-right), radians.
pub fn bottom_edge_angle(marker: &MarkerCorners) -> f64 {
    let d = marker[2] - marker[3];
    (d.y as f64).atan2(d.x as f64)
}

/// Reduce an edge angle modulo 90 degrees into `[-45, 45)` degrees (radians).
pub fn residual_angle(theta: f64) -> f64 {
    let t = theta.rem_euclid(FRAC_PI_2);
    if t < FRAC_PI_4 {
        t
    } else {
        t - FRAC_PI_2
    }
}

/// Discrete turn that brings an edge at angle `theta` back near zero.
pub fn quarter_turn_for(theta: f64) -> QuarterTurn {
    let q3 = 3.0 * FRAC_PI_4;
    if theta > FRAC_PI_4 && theta < q3 {
        QuarterTurn::CounterClockwise
    } else if theta < -FRAC_PI_4 && theta > -q3 {
        QuarterTurn::Clockwise
    } else if theta > q3 || theta < -q3 {
        QuarterTurn::Half
    } else {
        QuarterTurn::None
    }
}

/// Result of [`refine_angle`].
#[derive(Clone, Debug)]
pub struct Oriented {
    pub image: RgbImage,
    /// Dominant marker re-detected on `image`.
    pub marker: MarkerCorners,
    /// Continuous correction applied first, degrees counter-clockwise.
    pub residual_deg: f64,
    pub quarter_turn: QuarterTurn,
}

/// Rotate `frame` so that `marker` becomes axis-aligned and upright.
///
/// The bottom-edge angle is removed in two stages: a sub-pixel rotation by
/// the angle reduced into `[-45, 45)` degrees, then a lossless quarter turn
/// chosen from the unreduced angle. Markers are detected again on the result.
pub fn refine_angle(
    frame: &RgbImage,
    marker: &MarkerCorners,
    params: &FiducialParams,
) -> Result<Oriented, PipelineError> {
    let theta = bottom_edge_angle(marker);
    let residual_deg = residual_angle(theta).to_degrees();
    let quarter_turn = quarter_turn_for(theta);
    log::debug!(
        "marker edge at {:.3} deg: rotating by {residual_deg:.3} deg, then {quarter_turn:?}",
        theta.to_degrees()
    );

    let image = quarter_turn.apply(&rotate_degrees(frame, residual_deg));
    let marker = orient(&image, params)?;
    Ok(Oriented {
        image,
        marker,
        residual_deg,
        quarter_turn,
    })
}
