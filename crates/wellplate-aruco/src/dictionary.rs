//! Dictionary metadata and packed marker codes.

/// A fixed square-marker dictionary.
#[derive(Clone, Copy, Debug)]
pub struct Dictionary {
    /// Name as accepted by [`crate::builtin_dictionary`].
    pub name: &'static str,
    /// Inner bits per side, without the black border.
    pub marker_size: usize,
    /// Error-correcting capacity of the dictionary in bits.
    pub max_correction_bits: u8,
    /// One code per marker id.
    ///
    /// Bit `row * marker_size + col` is set for a **white** cell, matching the
    /// published OpenCV tables.
    pub codes: &'static [u64],
}

impl Dictionary {
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Code for `id`, if the dictionary has it.
    pub fn code(&self, id: u32) -> Option<u64> {
        self.codes.get(id as usize).copied()
    }

    /// Whether the cell at `(row, col)` of marker `id` is white.
    pub fn is_white(&self, id: u32, row: usize, col: usize) -> Option<bool> {
        if row >= self.marker_size || col >= self.marker_size {
            return None;
        }
        let code = self.code(id)?;
        Some((code >> (row * self.marker_size + col)) & 1 == 1)
    }
}
