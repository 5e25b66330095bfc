//! A1-style cell references and rectangular ranges

use std::fmt;
use std::str::FromStr;

/// Largest column index a worksheet accepts (XFD)
pub const MAX_COL: u16 = 16_383;
/// Largest row index a worksheet accepts
pub const MAX_ROW: u32 = 1_048_575;

/// Convert a zero-based column index into its letter form (0 -> A, 26 -> AA)
pub fn column_letter(index: u16) -> String {
    let mut letters = Vec::new();
    let mut n = index as i64;
    while n >= 0 {
        letters.push((b'A' + (n % 26) as u8) as char);
        n = n / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Parse column letters back into a zero-based index
pub fn parse_column(letters: &str) -> Option<u16> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut index: u32 = 0;
    for c in letters.chars() {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return None;
        }
        index = index * 26 + (c as u32 - 'A' as u32 + 1);
    }
    let index = index - 1;
    if index > MAX_COL as u32 {
        return None;
    }
    Some(index as u16)
}

/// Single cell position (zero-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u16,
}

impl CellRef {
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letter(self.col), self.row + 1)
    }
}

/// Error when parsing an A1 reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeParseError {
    pub input: String,
}

impl fmt::Display for RangeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid cell range '{}'", self.input)
    }
}

impl std::error::Error for RangeParseError {}

impl FromStr for CellRef {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || RangeParseError {
            input: s.to_string(),
        };
        let split = s.find(|c: char| c.is_ascii_digit()).ok_or_else(err)?;
        let (letters, digits) = s.split_at(split);
        let col = parse_column(letters).ok_or_else(err)?;
        let row: u32 = digits.parse().map_err(|_| err())?;
        if row == 0 || row - 1 > MAX_ROW {
            return Err(err());
        }
        Ok(CellRef::new(row - 1, col))
    }
}

/// Inclusive rectangular range of cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    pub fn new(start: CellRef, end: CellRef) -> Self {
        Self {
            start: CellRef::new(start.row.min(end.row), start.col.min(end.col)),
            end: CellRef::new(start.row.max(end.row), start.col.max(end.col)),
        }
    }

    /// Block anchored at A1 spanning `rows` x `cols` cells
    ///
    /// Returns `None` for an empty block or one that would overflow the sheet.
    pub fn from_origin(rows: usize, cols: usize) -> Option<Self> {
        if rows == 0 || cols == 0 || rows - 1 > MAX_ROW as usize || cols - 1 > MAX_COL as usize {
            return None;
        }
        Some(Self::new(
            CellRef::new(0, 0),
            CellRef::new((rows - 1) as u32, (cols - 1) as u16),
        ))
    }

    /// Rows `first_row..=last_row` of a single column
    pub fn column(col: u16, first_row: u32, last_row: u32) -> Self {
        Self::new(CellRef::new(first_row, col), CellRef::new(last_row, col))
    }

    /// The first row of this range
    pub fn first_row(&self) -> Self {
        Self::new(self.start, CellRef::new(self.start.row, self.end.col))
    }

    pub fn row_count(&self) -> usize {
        (self.end.row - self.start.row) as usize + 1
    }

    pub fn column_count(&self) -> usize {
        (self.end.col - self.start.col) as usize + 1
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        cell.row >= self.start.row
            && cell.row <= self.end.row
            && cell.col >= self.start.col
            && cell.col <= self.end.col
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl FromStr for CellRange {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((a, b)) => Ok(CellRange::new(a.parse()?, b.parse()?)),
            None => {
                let cell: CellRef = s.parse()?;
                Ok(CellRange::new(cell, cell))
            }
        }
    }
}
