//! Spreadsheet host
//!
//! An in-memory workbook that the export and import flows mutate through
//! batched [`Transaction`]s, persisted to disk as .xlsx.

pub mod document;
pub mod range;
pub mod transaction;
pub mod xlsx;

pub use document::{CellValue, PLACEHOLDER_SHEET, RangeStyle, SheetError, Workbook};
pub use range::{CellRange, column_letter};
pub use transaction::{DocumentHost, Transaction};
pub use xlsx::{TEXT_FORMAT, TEXT_MARKER};
