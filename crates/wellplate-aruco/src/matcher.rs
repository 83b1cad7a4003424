//! Rotation-aware dictionary lookup.

use crate::Dictionary;

/// Best dictionary entry for an observed code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub id: u32,
    /// Quarter turns such that `observed == rotate_code_u64(code, n, rotation)`.
    pub rotation: u8,
    pub hamming: u8,
}

/// Brute-force matcher over all ids and the four rotations.
///
/// Dictionaries here hold at most a few hundred codes, so a linear scan over
/// precomputed rotations is cheap.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    /// `None` when the marker does not fit into 64 bits.
    pub fn new(dict: Dictionary, max_hamming: u8) -> Option<Self> {
        let n = dict.marker_size;
        if dict.bit_count() > 64 || n == 0 {
            return None;
        }
        let rotated = dict
            .codes
            .iter()
            .map(|&c| [0u8, 1, 2, 3].map(|r| rotate_code_u64(c, n, r)))
            .collect();
        Some(Self {
            dict,
            max_hamming,
            rotated,
        })
    }

    #[inline]
    pub fn dictionary(&self) -> Dictionary {
        self.dict
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Closest code within `max_hamming`; ties keep the lowest id, then rotation.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<Match> = None;
        for (id, rots) in self.rotated.iter().enumerate() {
            for (rot, &cand) in rots.iter().enumerate() {
                let hamming = (observed ^ cand).count_ones() as u8;
                if hamming > self.max_hamming {
                    continue;
                }
                if best.is_some_and(|b| b.hamming <= hamming) {
                    continue;
                }
                best = Some(Match {
                    id: id as u32,
                    rotation: rot as u8,
                    hamming,
                });
                if hamming == 0 {
                    return best;
                }
            }
        }
        best
    }
}

/// Rotate an `n x n` row-major code (`idx = y * n + x`) by `rot` quarter turns.
///
/// One quarter turn moves the top-left cell to the top-right, i.e. clockwise
/// in image coordinates.
pub fn rotate_code_u64(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }
    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = match rot {
                1 => (y, n - 1 - x),
                2 => (n - 1 - x, n - 1 - y),
                _ => (n - 1 - y, x),
            };
            out |= ((code >> (sy * n + sx)) & 1) << (y * n + x);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin_dictionary;

    #[test]
    fn quarter_turn_moves_top_left_to_top_right() {
        let code = 1u64; // only (0, 0) set
        assert_eq!(rotate_code_u64(code, 4, 1), 1 << 3);
        assert_eq!(rotate_code_u64(code, 4, 2), 1 << 15);
        assert_eq!(rotate_code_u64(code, 4, 3), 1 << 12);
    }

    #[test]
    fn four_turns_are_identity() {
        let code = 0xb4cc;
        let r = (0..4).fold(code, |c, _| rotate_code_u64(c, 4, 1));
        assert_eq!(r, code);
    }

    #[test]
    fn finds_rotated_code_and_tolerates_one_flip() {
        let dict = builtin_dictionary("DICT_4X4_100").expect("builtin");
        let strict = Matcher::new(dict, 0).expect("matcher");
        let observed = rotate_code_u64(dict.codes[42], 4, 3);
        let m = strict.match_code(observed).expect("match");
        assert_eq!((m.id, m.rotation, m.hamming), (42, 3, 0));

        let flipped = observed ^ (1 << 6);
        assert!(strict.match_code(flipped).is_none());
        let lenient = Matcher::new(dict, 1).expect("matcher");
        let m = lenient.match_code(flipped).expect("match");
        assert_eq!((m.id, m.rotation, m.hamming), (42, 3, 1));
    }
}
