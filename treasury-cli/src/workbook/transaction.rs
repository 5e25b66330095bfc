//! Two-phase batches against a workbook document
//!
//! Commands are staged on a [`Transaction`] and only touch the document when
//! [`Transaction::sync`] flushes them. Reads return handles that are resolved
//! against the [`SyncResult`] of that flush, so callers stage every read they
//! need, flush once, then stage the writes that depend on them.

use log::{debug, trace};

use super::document::{CellValue, RangeStyle, SheetError};
use super::range::CellRange;

/// Document operations a batch can read
#[derive(Debug, Clone)]
pub enum ReadRequest {
    SheetExists(String),
    IsProtected(String),
    ActiveSheetName,
    ActiveRangeValues(CellRange),
}

/// Answer to a [`ReadRequest`]
#[derive(Debug, Clone, PartialEq)]
pub enum ReadResult {
    Flag(bool),
    Name(String),
    Values(Vec<Vec<CellValue>>),
}

/// Document mutations a batch can apply
#[derive(Debug, Clone)]
pub enum WriteOp {
    AddSheet(String),
    DeleteSheet(String),
    SetValues {
        sheet: String,
        range: CellRange,
        values: Vec<Vec<CellValue>>,
    },
    Style {
        sheet: String,
        range: CellRange,
        style: RangeStyle,
    },
    NumberFormat {
        sheet: String,
        range: CellRange,
        format: String,
    },
    Autofit {
        sheet: String,
        range: CellRange,
    },
    Activate(String),
}

/// Anything a transaction can be flushed against
pub trait DocumentHost {
    fn read(&self, request: &ReadRequest) -> Result<ReadResult, SheetError>;
    fn apply(&mut self, op: &WriteOp) -> Result<(), SheetError>;
}

#[derive(Debug, Clone)]
enum Command {
    Read(ReadRequest),
    Write(WriteOp),
}

/// Handle to the result of a staged read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadHandle(usize);

/// Staged batch of reads and writes
#[derive(Debug, Default)]
pub struct Transaction {
    commands: Vec<Command>,
    reads: usize,
    suspend_screen_updating: bool,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hint that the host may skip repainting until this batch is flushed
    pub fn suspend_screen_updating(&mut self) -> &mut Self {
        self.suspend_screen_updating = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn stage_read(&mut self, request: ReadRequest) -> ReadHandle {
        self.commands.push(Command::Read(request));
        self.reads += 1;
        ReadHandle(self.reads - 1)
    }

    fn stage_write(&mut self, op: WriteOp) -> &mut Self {
        self.commands.push(Command::Write(op));
        self
    }

    pub fn sheet_exists(&mut self, name: &str) -> ReadHandle {
        self.stage_read(ReadRequest::SheetExists(name.to_string()))
    }

    pub fn is_protected(&mut self, name: &str) -> ReadHandle {
        self.stage_read(ReadRequest::IsProtected(name.to_string()))
    }

    pub fn active_sheet_name(&mut self) -> ReadHandle {
        self.stage_read(ReadRequest::ActiveSheetName)
    }

    pub fn active_range_values(&mut self, range: CellRange) -> ReadHandle {
        self.stage_read(ReadRequest::ActiveRangeValues(range))
    }

    pub fn add_sheet(&mut self, name: &str) -> &mut Self {
        self.stage_write(WriteOp::AddSheet(name.to_string()))
    }

    pub fn delete_sheet(&mut self, name: &str) -> &mut Self {
        self.stage_write(WriteOp::DeleteSheet(name.to_string()))
    }

    pub fn set_values(
        &mut self,
        sheet: &str,
        range: CellRange,
        values: Vec<Vec<CellValue>>,
    ) -> &mut Self {
        self.stage_write(WriteOp::SetValues {
            sheet: sheet.to_string(),
            range,
            values,
        })
    }

    pub fn style(&mut self, sheet: &str, range: CellRange, style: RangeStyle) -> &mut Self {
        self.stage_write(WriteOp::Style {
            sheet: sheet.to_string(),
            range,
            style,
        })
    }

    pub fn number_format(&mut self, sheet: &str, range: CellRange, format: &str) -> &mut Self {
        self.stage_write(WriteOp::NumberFormat {
            sheet: sheet.to_string(),
            range,
            format: format.to_string(),
        })
    }

    pub fn autofit(&mut self, sheet: &str, range: CellRange) -> &mut Self {
        self.stage_write(WriteOp::Autofit {
            sheet: sheet.to_string(),
            range,
        })
    }

    pub fn activate(&mut self, sheet: &str) -> &mut Self {
        self.stage_write(WriteOp::Activate(sheet.to_string()))
    }

    /// Flush every staged command in order
    ///
    /// The first failing command aborts the flush; commands before it stay
    /// applied.
    pub fn sync<H: DocumentHost + ?Sized>(self, host: &mut H) -> Result<SyncResult, SheetError> {
        debug!(
            "Syncing batch: {} commands ({} reads){}",
            self.commands.len(),
            self.reads,
            if self.suspend_screen_updating {
                ", screen updating suspended"
            } else {
                ""
            }
        );

        let mut results = Vec::with_capacity(self.reads);
        for command in &self.commands {
            match command {
                Command::Read(request) => {
                    trace!("read {:?}", request);
                    results.push(host.read(request)?);
                }
                Command::Write(op) => {
                    trace!("write {:?}", op);
                    host.apply(op)?;
                }
            }
        }
        Ok(SyncResult { results })
    }
}

/// Read results of a flushed transaction
#[derive(Debug, Clone)]
pub struct SyncResult {
    results: Vec<ReadResult>,
}

impl SyncResult {
    pub fn flag(&self, handle: ReadHandle) -> Result<bool, SheetError> {
        match self.results.get(handle.0) {
            Some(ReadResult::Flag(b)) => Ok(*b),
            _ => Err(SheetError::UnexpectedRead),
        }
    }

    pub fn name(&self, handle: ReadHandle) -> Result<&str, SheetError> {
        match self.results.get(handle.0) {
            Some(ReadResult::Name(n)) => Ok(n),
            _ => Err(SheetError::UnexpectedRead),
        }
    }

    pub fn values(&self, handle: ReadHandle) -> Result<&[Vec<CellValue>], SheetError> {
        match self.results.get(handle.0) {
            Some(ReadResult::Values(v)) => Ok(v),
            _ => Err(SheetError::UnexpectedRead),
        }
    }
}
