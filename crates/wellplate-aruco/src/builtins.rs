//! Embedded built-in dictionaries.
//!
//! Only the 4x4 family is shipped: the deck fiducial is a 4x4 ArUco marker.
//! OpenCV's `DICT_4X4_50`, `_100`, `_250` and `_1000` are prefixes of one
//! table. The first 100 codes of that table are embedded; the larger names
//! resolve to that prefix, so markers with id < 100 printed from any of them
//! decode unchanged and higher ids are not recognized.

#![allow(clippy::unreadable_literal)]

use crate::Dictionary;

/// Names accepted by [`builtin_dictionary`].
pub const BUILTIN_DICTIONARY_NAMES: &[&str] = &[
    "DICT_4X4_50",
    "DICT_4X4_100",
    "DICT_4X4_250",
    "DICT_4X4_1000",
];

/// Default dictionary for deck fiducials.
pub const DEFAULT_DICTIONARY: &str = "DICT_4X4_250";

// Row-major, white = 1.
#[rustfmt::skip]
static CODES_4X4: [u64; 100] = [
    0x4cad, 0x59f0, 0xb4cc, 0x6299, 0x792a, 0xb39e, 0x7479, 0x4f23,
    0x5b7f, 0x6af3, 0x899f, 0xe588, 0xed70, 0xf054, 0x8d24, 0x7c64,
    0xa662, 0x0066, 0x7a36, 0xf56e, 0xd161, 0xd40d, 0xab33, 0x41bb,
    0xe27f, 0x8e29, 0x2735, 0x2aa5, 0xc484, 0xf62c, 0xa822, 0x4dea,
    0xf379, 0xd30f, 0x7510, 0x9490, 0xae18, 0xff20, 0x6fb0, 0x5a38,
    0x18e8, 0x1454, 0x314c, 0x4d1c, 0x1724, 0xd774, 0xfcb4, 0x26d2,
    0x740a, 0xc80a, 0x298a, 0x16aa, 0x82ba, 0xe9fa, 0x8016, 0xe616,
    0x2486, 0x9786, 0x48d6, 0xa7f6, 0xfbe6, 0xd87e, 0x0501, 0x22c1,
    0x45d1, 0x5ec9, 0x3621, 0x54a1, 0x39a1, 0x9139, 0x85f9, 0x3edd,
    0x203d, 0xda6d, 0x13fd, 0xd5ed, 0xf853, 0x4693, 0x1a9b, 0xabcb,
    0x1933, 0x05e3, 0xeca3, 0xba97, 0xa49f, 0xdddf, 0x5477, 0xb2ef,
    0xaeac, 0xb551, 0xe86e, 0xf350, 0xd260, 0x83b4, 0x1b92, 0x2fc2,
    0x6cf2, 0xcbf2, 0x2796, 0xe30e,
];

/// Look up a built-in dictionary by name.
pub fn builtin_dictionary(name: &str) -> Option<Dictionary> {
    let (name, count) = match name {
        "DICT_4X4_50" => ("DICT_4X4_50", 50),
        "DICT_4X4_100" => ("DICT_4X4_100", 100),
        "DICT_4X4_250" => ("DICT_4X4_250", CODES_4X4.len()),
        "DICT_4X4_1000" => ("DICT_4X4_1000", CODES_4X4.len()),
        _ => return None,
    };
    Some(Dictionary {
        name,
        marker_size: 4,
        max_correction_bits: 1,
        codes: &CODES_4X4[..count],
    })
}
