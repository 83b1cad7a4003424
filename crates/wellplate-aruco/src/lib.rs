//! Square fiducial (ArUco 4x4) detection for deck images.
//!
//! Pipeline per frame:
//! - local-mean adaptive threshold at a few window sizes,
//! - contour tracing and polygon simplification into convex quads,
//! - bit sampling through a quad homography, Otsu split per marker,
//! - rotation-aware lookup in an embedded dictionary.
//!
//! Detected corners are ordered top-left, top-right, bottom-right,
//! bottom-left **of the marker**, so the order is stable under rotation.

pub mod builtins;
mod decode;
mod detect;
mod dictionary;
mod matcher;
mod quad;
mod render;
mod threshold;

pub use builtins::{builtin_dictionary, BUILTIN_DICTIONARY_NAMES, DEFAULT_DICTIONARY};
pub use detect::{
    corners_and_ids, detect_fiducials, detect_fiducials_gray, Fiducial, FiducialParams,
};
pub use dictionary::Dictionary;
pub use matcher::{rotate_code_u64, Match, Matcher};
pub use quad::{find_quads, QuadFilter};
pub use render::{draw_marker, render_marker};
pub use threshold::adaptive_threshold_inv;
