//! Download pipeline
//!
//! Validated request -> endpoint -> records -> grid -> sheet. Each stage
//! fails with its own error type; [`DownloadError`] carries whichever one
//! stopped the run.

pub mod fields;
pub mod transform;
pub mod writer;

use std::fmt;

use log::info;

use crate::api::{DownloadRequest, FetchError, ODataClient, Session, ValidationError, build_endpoint};
use crate::workbook::{DocumentHost, SheetError};

pub use transform::to_grid;
pub use writer::{restore_formats, write_grid};

/// Why a download did not reach the sheet
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadError {
    Validation(ValidationError),
    Fetch(FetchError),
    Sheet(SheetError),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::Validation(e) => write!(f, "{}", e),
            DownloadError::Fetch(e) => write!(f, "{}", e),
            DownloadError::Sheet(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DownloadError {}

impl From<ValidationError> for DownloadError {
    fn from(e: ValidationError) -> Self {
        DownloadError::Validation(e)
    }
}

impl From<FetchError> for DownloadError {
    fn from(e: FetchError) -> Self {
        DownloadError::Fetch(e)
    }
}

impl From<SheetError> for DownloadError {
    fn from(e: SheetError) -> Self {
        DownloadError::Sheet(e)
    }
}

/// What a finished download produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    pub sheet_name: String,
    pub records: usize,
    pub columns: usize,
}

/// Runs downloads for one authenticated session
pub struct DownloadPipeline<'a> {
    client: &'a ODataClient,
    session: &'a Session,
    field_allow_list: Vec<String>,
}

impl<'a> DownloadPipeline<'a> {
    pub fn new(client: &'a ODataClient, session: &'a Session) -> Self {
        Self {
            client,
            session,
            field_allow_list: Vec::new(),
        }
    }

    /// Restrict cash-flow field selections to these names
    pub fn with_field_allow_list(mut self, fields: Vec<String>) -> Self {
        self.field_allow_list = fields;
        self
    }

    pub async fn run<H: DocumentHost + ?Sized>(
        &self,
        request: &DownloadRequest,
        host: &mut H,
    ) -> Result<DownloadSummary, DownloadError> {
        request.validate(&self.field_allow_list)?;

        let fields = request.effective_fields();
        let endpoint = build_endpoint(request.kind, request.limit, fields);
        info!(
            "Downloading {} (limit {}, {} fields)",
            request.kind,
            request.limit,
            fields.len()
        );

        let records = self.client.fetch_records(&endpoint, self.session).await?;
        info!("Received {} records", records.len());

        let grid = to_grid(&records, fields);
        let sheet_name = request.kind.sheet_name();
        write_grid(host, sheet_name, &grid)?;

        Ok(DownloadSummary {
            sheet_name: sheet_name.to_string(),
            records: records.len(),
            columns: grid.column_count(),
        })
    }
}
