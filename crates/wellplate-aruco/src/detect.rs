//! Square-marker detection on full frames.

use image::{DynamicImage, GrayImage};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use wellplate_core::GrayImageView;

use crate::builtins::{builtin_dictionary, DEFAULT_DICTIONARY};
use crate::decode::{marker_corners, QuadDecoder};
use crate::quad::{find_quads, QuadFilter};
use crate::threshold::adaptive_threshold_inv;
use crate::Matcher;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Detector settings. Defaults follow the usual ArUco detector parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FiducialParams {
    /// Built-in dictionary name, see [`crate::BUILTIN_DICTIONARY_NAMES`].
    pub dictionary: String,
    /// Radii of the adaptive-threshold windows; each radius is one pass.
    pub threshold_radii: Vec<u32>,
    /// Offset below the local mean for a pixel to count as dark.
    pub threshold_constant: i16,
    pub min_perimeter_rate: f64,
    pub max_perimeter_rate: f64,
    pub polygon_accuracy_rate: f64,
    pub min_side_rate: f64,
    pub min_border_distance: f32,
    /// Border width of the printed marker, in bits.
    pub border_bits: usize,
    /// Fraction of each cell ignored near its edges when sampling.
    pub cell_margin: f32,
    /// Minimum fraction of dark border cells.
    pub min_border_score: f32,
    pub max_hamming: u8,
}

impl Default for FiducialParams {
    fn default() -> Self {
        Self {
            dictionary: DEFAULT_DICTIONARY.to_string(),
            threshold_radii: vec![1, 6, 11],
            threshold_constant: 7,
            min_perimeter_rate: 0.03,
            max_perimeter_rate: 4.0,
            polygon_accuracy_rate: 0.03,
            min_side_rate: 0.05,
            min_border_distance: 3.0,
            border_bits: 1,
            cell_margin: 0.13,
            min_border_score: 0.8,
            max_hamming: 0,
        }
    }
}

impl FiducialParams {
    fn quad_filter(&self) -> QuadFilter {
        QuadFilter {
            min_perimeter_rate: self.min_perimeter_rate,
            max_perimeter_rate: self.max_perimeter_rate,
            polygon_accuracy_rate: self.polygon_accuracy_rate,
            min_side_rate: self.min_side_rate,
            min_border_distance: self.min_border_distance,
        }
    }
}

/// One detected marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fiducial {
    pub id: u32,
    /// Top-left, top-right, bottom-right, bottom-left of the marker itself,
    /// independent of how it is rotated in the image.
    pub corners: [Point2<f32>; 4],
    pub hamming: u8,
    pub border_score: f32,
}

impl Fiducial {
    /// Length of the corner 0 to corner 2 diagonal.
    pub fn diagonal(&self) -> f32 {
        (self.corners[0] - self.corners[2]).norm()
    }

    pub fn center(&self) -> Point2<f32> {
        let sum = self
            .corners
            .iter()
            .fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
        Point2::from(sum / 4.0)
    }
}

/// Split detections into parallel `(corner_sets, ids)` lists.
pub fn corners_and_ids(fiducials: &[Fiducial]) -> (Vec<[Point2<f32>; 4]>, Vec<u32>) {
    fiducials.iter().map(|f| (f.corners, f.id)).unzip()
}

/// Detect markers in a gray or color image.
pub fn detect_fiducials(image: &DynamicImage, params: &FiducialParams) -> Vec<Fiducial> {
    match image {
        DynamicImage::ImageLuma8(gray) => detect_fiducials_gray(gray, params),
        other => detect_fiducials_gray(&other.to_luma8(), params),
    }
}

/// Detect markers in a grayscale image.
///
/// An empty result means nothing was found; an unknown dictionary name is
/// logged and also yields no detections.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(gray, params),
        fields(width = gray.width(), height = gray.height())
    )
)]
pub fn detect_fiducials_gray(gray: &GrayImage, params: &FiducialParams) -> Vec<Fiducial> {
    let Some(dict) = builtin_dictionary(&params.dictionary) else {
        log::warn!("unknown marker dictionary {:?}", params.dictionary);
        return Vec::new();
    };
    let Some(matcher) = Matcher::new(dict, params.max_hamming) else {
        return Vec::new();
    };
    let Some(view) = GrayImageView::new(
        gray.width() as usize,
        gray.height() as usize,
        gray.as_raw(),
    ) else {
        return Vec::new();
    };

    let mut decoder = QuadDecoder::new(
        &matcher,
        params.border_bits,
        params.cell_margin,
        params.min_border_score,
    );
    let filter = params.quad_filter();
    let mut found: Vec<Fiducial> = Vec::new();

    for &radius in &params.threshold_radii {
        let binary = adaptive_threshold_inv(gray, radius, params.threshold_constant);
        let quads = find_quads(&binary, &filter);
        log::debug!("threshold radius {radius}: {} candidate quads", quads.len());

        for quad in quads {
            let Some(dec) = decoder.decode(&view, &quad) else {
                continue;
            };
            let fid = Fiducial {
                id: dec.matched.id,
                corners: marker_corners(&quad, dec.matched.rotation),
                hamming: dec.matched.hamming,
                border_score: dec.border_score,
            };
            if !is_duplicate(&found, &fid) {
                log::trace!("marker {} code {:#06x}", fid.id, dec.code);
                found.push(fid);
            }
        }
    }

    found.sort_by(|a, b| {
        a.id.cmp(&b.id).then(
            b.diagonal()
                .partial_cmp(&a.diagonal())
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });
    log::debug!("detected {} markers", found.len());
    found
}

/// Same id with a nearby center: the same physical marker seen in another pass.
fn is_duplicate(found: &[Fiducial], cand: &Fiducial) -> bool {
    let c = cand.center();
    let tol = 0.25 * cand.diagonal();
    found
        .iter()
        .any(|f| f.id == cand.id && (f.center() - c).norm() < tol)
}
