//! Well naming and plate boxes.

use std::fmt;
use std::str::FromStr;

use nalgebra::Point2;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Rows of a standard 96-well plate (`A`..`H`).
pub const PLATE_ROWS: usize = 8;
/// Columns of a standard 96-well plate (`1`..`12`).
pub const PLATE_COLS: usize = 12;

const ROW_LETTERS: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WellNameError {
    #[error("empty well name")]
    Empty,
    #[error("invalid row letter in well name {0:?}")]
    BadRow(String),
    #[error("invalid column number in well name {0:?}")]
    BadColumn(String),
}

/// Logical well address, 0-based internally, displayed as `"A1"`.
///
/// Ordering is row-major: `A1 < A2 < ... < A12 < B1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WellName {
    pub row: u8,
    pub col: u8,
}

impl WellName {
    pub fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Whether the well exists on a `rows` x `cols` plate.
    pub fn fits(&self, rows: usize, cols: usize) -> bool {
        (self.row as usize) < rows && (self.col as usize) < cols
    }

    /// Grid-space coordinate `(column, row)`.
    pub fn grid_point(&self) -> Point2<f64> {
        Point2::new(self.col as f64, self.row as f64)
    }
}

impl fmt::Display for WellName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = ROW_LETTERS[self.row as usize % ROW_LETTERS.len()] as char;
        write!(f, "{}{}", letter, self.col as u32 + 1)
    }
}

impl FromStr for WellName {
    type Err = WellNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let first = chars.next().ok_or(WellNameError::Empty)?;
        if !first.is_ascii_alphabetic() {
            return Err(WellNameError::BadRow(s.to_string()));
        }
        let row = first.to_ascii_uppercase() as u8 - b'A';

        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WellNameError::BadColumn(s.to_string()));
        }
        let col: u32 = digits
            .parse()
            .map_err(|_| WellNameError::BadColumn(s.to_string()))?;
        if col == 0 || col > u8::MAX as u32 {
            return Err(WellNameError::BadColumn(s.to_string()));
        }
        Ok(Self::new(row, (col - 1) as u8))
    }
}

impl Serialize for WellName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WellName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// All well names of a `rows` x `cols` plate in row-major order.
pub fn well_names(rows: usize, cols: usize) -> Vec<WellName> {
    let rows = rows.min(ROW_LETTERS.len());
    let cols = cols.min(u8::MAX as usize);
    (0..rows)
        .flat_map(|r| (0..cols).map(move |c| WellName::new(r as u8, c as u8)))
        .collect()
}

/// Axis-aligned pixel rectangle `(x1, y1, x2, y2)` around one deck slot.
///
/// The two corners are stored as projected; `x1 > x2` is allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl PlateBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Corner-to-corner length in pixels.
    pub fn diagonal(&self) -> f64 {
        let dx = (self.x1 - self.x2) as f64;
        let dy = (self.y1 - self.y2) as f64;
        dx.hypot(dy)
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            (self.x1 + self.x2) as f64 / 2.0,
            (self.y1 + self.y2) as f64 / 2.0,
        )
    }

    pub fn min_x(&self) -> i32 {
        self.x1.min(self.x2)
    }

    pub fn max_x(&self) -> i32 {
        self.x1.max(self.x2)
    }

    pub fn min_y(&self) -> i32 {
        self.y1.min(self.y2)
    }

    pub fn max_y(&self) -> i32 {
        self.y1.max(self.y2)
    }

    /// Strict interior test: the open box excludes its own border.
    pub fn strictly_contains(&self, x: f64, y: f64) -> bool {
        x > self.min_x() as f64
            && x < self.max_x() as f64
            && y > self.min_y() as f64
            && y < self.max_y() as f64
    }

    /// All four coordinates positive and below the image size.
    pub fn inside_image(&self, width: u32, height: u32) -> bool {
        let (w, h) = (width as i64, height as i64);
        [self.x1, self.y1, self.x2, self.y2].iter().all(|&v| v > 0)
            && (self.x1 as i64) < w
            && (self.x2 as i64) < w
            && (self.y1 as i64) < h
            && (self.y2 as i64) < h
    }
}
