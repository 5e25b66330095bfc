//! In-memory workbook document

use std::collections::BTreeMap;
use std::fmt;

use super::range::{CellRange, CellRef};
use super::transaction::{DocumentHost, ReadRequest, ReadResult, WriteOp};

/// Name Excel gives the sheet of a brand-new workbook
pub const PLACEHOLDER_SHEET: &str = "Sheet1";

const MAX_SHEET_NAME_LEN: usize = 31;
const FORBIDDEN_NAME_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Fill and font settings applied to a range
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeStyle {
    /// Background fill as `#RRGGBB`
    pub fill: Option<String>,
    pub bold: bool,
    /// Font color as `#RRGGBB`
    pub font_color: Option<String>,
}

/// Errors raised by the workbook host
#[derive(Debug, Clone, PartialEq)]
pub enum SheetError {
    /// Sheet is protected and cannot be written
    Protected { sheet: String },
    /// No sheet with the given name exists
    NotFound { sheet: String },
    /// A sheet with the given name already exists
    DuplicateName { sheet: String },
    /// Sheet name breaks Excel's naming rules
    InvalidName { sheet: String },
    /// The only remaining sheet cannot be deleted
    LastSheet,
    /// Values do not match the shape of the target range
    ShapeMismatch {
        range: String,
        rows: usize,
        cols: usize,
    },
    /// Nothing to write (no columns)
    EmptyGrid,
    /// A read result was requested with the wrong type or handle
    UnexpectedRead,
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::Protected { sheet } => {
                write!(f, "sheet '{}' is protected, data cannot be written", sheet)
            }
            SheetError::NotFound { sheet } => write!(f, "sheet '{}' does not exist", sheet),
            SheetError::DuplicateName { sheet } => {
                write!(f, "a sheet named '{}' already exists", sheet)
            }
            SheetError::InvalidName { sheet } => write!(f, "'{}' is not a valid sheet name", sheet),
            SheetError::LastSheet => write!(f, "a workbook must keep at least one sheet"),
            SheetError::ShapeMismatch { range, rows, cols } => write!(
                f,
                "values of shape {}x{} do not fit range {}",
                rows, cols, range
            ),
            SheetError::EmptyGrid => write!(f, "no columns to write"),
            SheetError::UnexpectedRead => write!(f, "read result does not match its request"),
        }
    }
}

impl std::error::Error for SheetError {}

/// A worksheet: sparse cells plus formatting applied to ranges
#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<CellRef, CellValue>,
    styles: Vec<(CellRange, RangeStyle)>,
    number_formats: Vec<(CellRange, String)>,
    autofit: Vec<CellRange>,
    protected: bool,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            styles: Vec::new(),
            number_formats: Vec::new(),
            autofit: Vec::new(),
            protected: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    #[cfg(test)]
    pub fn set_protected(&mut self, protected: bool) {
        self.protected = protected;
    }

    /// Value at a cell, `Empty` when unset
    pub fn cell(&self, cell: CellRef) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(&cell).unwrap_or(&EMPTY)
    }

    pub fn set_cell(&mut self, cell: CellRef, value: CellValue) {
        if matches!(value, CellValue::Empty) {
            self.cells.remove(&cell);
        } else {
            self.cells.insert(cell, value);
        }
    }

    /// Non-empty cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (&CellRef, &CellValue)> {
        self.cells.iter()
    }

    /// Block from `A1` to the last row and column holding a value
    pub fn used_range(&self) -> Option<CellRange> {
        let last_row = self.cells.keys().map(|c| c.row).max()?;
        let last_col = self.cells.keys().map(|c| c.col).max()?;
        Some(CellRange::new(CellRef::new(0, 0), CellRef::new(last_row, last_col)))
    }

    /// Values of a range as rows
    pub fn values(&self, range: CellRange) -> Vec<Vec<CellValue>> {
        (range.start.row..=range.end.row)
            .map(|row| {
                (range.start.col..=range.end.col)
                    .map(|col| self.cell(CellRef::new(row, col)).clone())
                    .collect()
            })
            .collect()
    }

    /// The merged style covering a cell, if any range style applies
    pub fn style_at(&self, cell: CellRef) -> Option<RangeStyle> {
        let mut merged: Option<RangeStyle> = None;
        for (_, style) in self.styles.iter().filter(|(r, _)| r.contains(cell)) {
            let current = merged.get_or_insert_with(RangeStyle::default);
            if style.fill.is_some() {
                current.fill = style.fill.clone();
            }
            if style.font_color.is_some() {
                current.font_color = style.font_color.clone();
            }
            current.bold |= style.bold;
        }
        merged
    }

    /// Last number format applied over a cell
    pub fn number_format_at(&self, cell: CellRef) -> Option<&str> {
        self.number_formats
            .iter()
            .rev()
            .find(|(range, _)| range.contains(cell))
            .map(|(_, format)| format.as_str())
    }

    /// Columns that were marked for autofit
    pub fn autofit_ranges(&self) -> &[CellRange] {
        &self.autofit
    }

    /// Cells that carry a style or number format but no value
    pub fn formatted_cells(&self) -> Vec<CellRef> {
        let mut out = Vec::new();
        for range in self
            .styles
            .iter()
            .map(|(r, _)| *r)
            .chain(self.number_formats.iter().map(|(r, _)| *r))
        {
            for row in range.start.row..=range.end.row {
                for col in range.start.col..=range.end.col {
                    out.push(CellRef::new(row, col));
                }
            }
        }
        out.sort();
        out.dedup();
        out
    }

    fn ensure_writable(&self) -> Result<(), SheetError> {
        if self.protected {
            return Err(SheetError::Protected {
                sheet: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// Ordered collection of sheets with one active sheet
#[derive(Debug, Clone)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    active: usize,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    /// New workbook holding just the placeholder sheet
    pub fn new() -> Self {
        Self {
            sheets: vec![Sheet::new(PLACEHOLDER_SHEET)],
            active: 0,
        }
    }

    /// Build from already-loaded sheets; the first sheet becomes active
    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        if sheets.is_empty() {
            return Self::new();
        }
        Self { sheets, active: 0 }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.position(name).map(|i| &self.sheets[i])
    }

    #[cfg(test)]
    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.position(name).map(move |i| &mut self.sheets[i])
    }

    pub fn active_sheet(&self) -> &Sheet {
        &self.sheets[self.active]
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Excel compares sheet names case-insensitively
    fn position(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
    }

    fn require(&self, name: &str) -> Result<usize, SheetError> {
        self.position(name).ok_or_else(|| SheetError::NotFound {
            sheet: name.to_string(),
        })
    }

    fn add_sheet(&mut self, name: &str) -> Result<(), SheetError> {
        validate_sheet_name(name)?;
        if self.position(name).is_some() {
            return Err(SheetError::DuplicateName {
                sheet: name.to_string(),
            });
        }
        self.sheets.push(Sheet::new(name));
        Ok(())
    }

    fn delete_sheet(&mut self, name: &str) -> Result<(), SheetError> {
        let index = self.require(name)?;
        if self.sheets.len() == 1 {
            return Err(SheetError::LastSheet);
        }
        self.sheets.remove(index);
        if self.active > index || self.active >= self.sheets.len() {
            self.active = self.active.saturating_sub(1);
        }
        Ok(())
    }

    fn set_values(
        &mut self,
        sheet: &str,
        range: CellRange,
        values: &[Vec<CellValue>],
    ) -> Result<(), SheetError> {
        let index = self.require(sheet)?;
        let target = &mut self.sheets[index];
        target.ensure_writable()?;

        let shape_ok = values.len() == range.row_count()
            && values.iter().all(|row| row.len() == range.column_count());
        if !shape_ok {
            return Err(SheetError::ShapeMismatch {
                range: range.to_string(),
                rows: values.len(),
                cols: values.first().map(|r| r.len()).unwrap_or(0),
            });
        }

        for (r, row) in values.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let cell = CellRef::new(range.start.row + r as u32, range.start.col + c as u16);
                target.set_cell(cell, value.clone());
            }
        }
        Ok(())
    }
}

impl DocumentHost for Workbook {
    fn read(&self, request: &ReadRequest) -> Result<ReadResult, SheetError> {
        match request {
            ReadRequest::SheetExists(name) => Ok(ReadResult::Flag(self.position(name).is_some())),
            ReadRequest::IsProtected(name) => {
                let index = self.require(name)?;
                Ok(ReadResult::Flag(self.sheets[index].protected))
            }
            ReadRequest::ActiveSheetName => Ok(ReadResult::Name(self.active_sheet().name.clone())),
            ReadRequest::ActiveRangeValues(range) => {
                Ok(ReadResult::Values(self.active_sheet().values(*range)))
            }
        }
    }

    fn apply(&mut self, op: &WriteOp) -> Result<(), SheetError> {
        match op {
            WriteOp::AddSheet(name) => self.add_sheet(name),
            WriteOp::DeleteSheet(name) => self.delete_sheet(name),
            WriteOp::SetValues {
                sheet,
                range,
                values,
            } => self.set_values(sheet, *range, values),
            WriteOp::Style {
                sheet,
                range,
                style,
            } => {
                let index = self.require(sheet)?;
                let target = &mut self.sheets[index];
                target.ensure_writable()?;
                target.styles.push((*range, style.clone()));
                Ok(())
            }
            WriteOp::NumberFormat {
                sheet,
                range,
                format,
            } => {
                let index = self.require(sheet)?;
                let target = &mut self.sheets[index];
                target.ensure_writable()?;
                target.number_formats.push((*range, format.clone()));
                Ok(())
            }
            WriteOp::Autofit { sheet, range } => {
                let index = self.require(sheet)?;
                self.sheets[index].autofit.push(*range);
                Ok(())
            }
            WriteOp::Activate(name) => {
                self.active = self.require(name)?;
                Ok(())
            }
        }
    }
}

fn validate_sheet_name(name: &str) -> Result<(), SheetError> {
    let invalid = name.trim().is_empty()
        || name.chars().count() > MAX_SHEET_NAME_LEN
        || name.contains(FORBIDDEN_NAME_CHARS)
        || name.starts_with('\'')
        || name.ends_with('\'');
    if invalid {
        return Err(SheetError::InvalidName {
            sheet: name.to_string(),
        });
    }
    Ok(())
}
