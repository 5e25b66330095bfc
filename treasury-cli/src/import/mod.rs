//! Post the active sheet's first data row to the import endpoint
//!
//! Reads `A1:B2` of the active sheet (headers in row 1, values in row 2),
//! posts `{title, body, userId}` and records the outcome in a new
//! `Resultado` sheet.

use std::fmt;
use std::sync::Arc;

use chrono::Local;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::api::resilience::{RetryConfig, RetryError, RetryPolicy, RetryableError};
use crate::api::transport::{HttpTransport, TransportError};
use crate::workbook::{CellRange, CellValue, DocumentHost, RangeStyle, SheetError, Transaction, Workbook};

pub const DEFAULT_IMPORT_URL: &str = "https://jsonplaceholder.typicode.com/posts";

const RESULT_SHEET: &str = "Resultado";
const RESULT_HEADERS: [&str; 3] = ["ID", "Estado", "Fecha"];
const RESULT_STATUS: &str = "Importado exitosamente";
const RESULT_HEADER_FILL: &str = "#D3D3D3";

/// Fixed owner of imported posts
const IMPORT_USER_ID: u32 = 1;

/// Body sent to the import endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPayload {
    pub title: String,
    pub body: String,
    pub user_id: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct ImportResponse {
    id: Option<serde_json::Value>,
}

/// Outcome of a successful import
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReceipt {
    pub result_sheet: String,
    pub remote_id: CellValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportError {
    /// The source range has fewer than two rows
    NotEnoughData,
    /// `A1` or `B1` is empty
    MissingHeaders,
    /// Both `A2` and `B2` are empty
    NoData,
    /// Every attempt to post failed
    SendFailed { attempts: u32, last: String },
    /// The endpoint answered with something other than JSON
    Decode(String),
    Sheet(SheetError),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::NotEnoughData => write!(f, "not enough data to import"),
            ImportError::MissingHeaders => write!(f, "headers are required in A1 and B1"),
            ImportError::NoData => write!(f, "no data to import in A2:B2"),
            ImportError::SendFailed { attempts, last } => {
                write!(f, "failed to send data after {} attempts ({})", attempts, last)
            }
            ImportError::Decode(e) => write!(f, "unexpected import response: {}", e),
            ImportError::Sheet(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ImportError {}

impl From<SheetError> for ImportError {
    fn from(e: SheetError) -> Self {
        ImportError::Sheet(e)
    }
}

/// A failed post attempt
#[derive(Debug)]
enum PostFailure {
    Transport(TransportError),
    Status(u16),
}

impl fmt::Display for PostFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostFailure::Transport(e) => write!(f, "{}", e),
            PostFailure::Status(code) => write!(f, "HTTP error! status: {}", code),
        }
    }
}

impl RetryableError for PostFailure {
    // Error statuses are retried here, unlike the data service fetch
    fn is_retryable(&self) -> bool {
        true
    }
}

fn result_header_style() -> RangeStyle {
    RangeStyle {
        fill: Some(RESULT_HEADER_FILL.to_string()),
        bold: true,
        font_color: None,
    }
}

fn is_result_sheet(name: &str) -> bool {
    match name.strip_prefix(RESULT_SHEET) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('_')
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit())),
        None => false,
    }
}

/// Put back the header style of result sheets loaded from a file
pub fn restore_result_formats(workbook: &mut Workbook) -> Result<(), SheetError> {
    let mut tx = Transaction::new();
    for sheet in workbook.sheets().iter().filter(|s| is_result_sheet(s.name())) {
        if let Some(block) = sheet.used_range() {
            tx.style(sheet.name(), block.first_row(), result_header_style())
                .autofit(sheet.name(), block);
        }
    }
    if !tx.is_empty() {
        tx.sync(workbook)?;
    }
    Ok(())
}

/// Build the payload from the `A1:B2` values
pub fn payload_from_values(values: &[Vec<CellValue>]) -> Result<ImportPayload, ImportError> {
    if values.len() < 2 {
        return Err(ImportError::NotEnoughData);
    }
    let cell = |row: usize, col: usize| -> CellValue {
        values
            .get(row)
            .and_then(|r| r.get(col))
            .cloned()
            .unwrap_or(CellValue::Empty)
    };

    if cell(0, 0).is_empty() || cell(0, 1).is_empty() {
        return Err(ImportError::MissingHeaders);
    }
    let (title, body) = (cell(1, 0), cell(1, 1));
    if title.is_empty() && body.is_empty() {
        return Err(ImportError::NoData);
    }

    Ok(ImportPayload {
        title: title.to_string(),
        body: body.to_string(),
        user_id: IMPORT_USER_ID,
    })
}

/// Sends the active row to a REST endpoint
pub struct Importer {
    transport: Arc<dyn HttpTransport>,
    url: String,
    retry: RetryPolicy,
}

impl Importer {
    pub fn new(transport: Arc<dyn HttpTransport>, url: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            transport,
            url: url.into(),
            retry: RetryPolicy::new(retry),
        }
    }

    pub async fn import_active_row<H: DocumentHost + ?Sized>(
        &self,
        host: &mut H,
    ) -> Result<ImportReceipt, ImportError> {
        let source: CellRange = "A1:B2".parse().map_err(|_| ImportError::NotEnoughData)?;

        let mut read = Transaction::new();
        read.suspend_screen_updating();
        let sheet_name = read.active_sheet_name();
        let values = read.active_range_values(source);
        let snapshot = read.sync(host)?;

        let values = snapshot.values(values)?;
        debug!("Import source from '{}': {:?}", snapshot.name(sheet_name)?, values);
        let payload = payload_from_values(values)?;

        let remote_id = self.send(&payload).await?;
        info!("Imported row, remote id {}", remote_id);

        let result_sheet = self.unique_result_name(host)?;
        let now = Local::now().format("%d/%m/%Y %H:%M:%S").to_string();
        let block: CellRange = "A1:C2".parse().map_err(|_| ImportError::NotEnoughData)?;

        let mut write = Transaction::new();
        write.suspend_screen_updating();
        write
            .add_sheet(&result_sheet)
            .set_values(
                &result_sheet,
                block,
                vec![
                    RESULT_HEADERS.iter().map(|h| CellValue::text(*h)).collect(),
                    vec![remote_id.clone(), CellValue::text(RESULT_STATUS), CellValue::Text(now)],
                ],
            )
            .style(&result_sheet, block.first_row(), result_header_style())
            .autofit(&result_sheet, block);
        write.sync(host)?;

        Ok(ImportReceipt {
            result_sheet,
            remote_id,
        })
    }

    async fn send(&self, payload: &ImportPayload) -> Result<CellValue, ImportError> {
        let body = serde_json::to_value(payload).map_err(|e| ImportError::Decode(e.to_string()))?;
        let headers = vec![("Content-Type".to_string(), "application/json".to_string())];

        let response = self
            .retry
            .execute("import post", |attempt| {
                let transport = Arc::clone(&self.transport);
                let url = self.url.clone();
                let headers = headers.clone();
                let body = body.clone();
                async move {
                    debug!("Import attempt {}", attempt);
                    let response = transport
                        .post_json(&url, &headers, &body)
                        .await
                        .map_err(PostFailure::Transport)?;
                    if !response.is_success() {
                        return Err(PostFailure::Status(response.status));
                    }
                    Ok::<_, PostFailure>(response)
                }
            })
            .await
            .map_err(|e| match e {
                RetryError::Exhausted { attempts, last } => ImportError::SendFailed {
                    attempts,
                    last: last.to_string(),
                },
                RetryError::Aborted { attempt, error } => ImportError::SendFailed {
                    attempts: attempt,
                    last: error.to_string(),
                },
            })?;

        let parsed: ImportResponse =
            serde_json::from_str(&response.body).map_err(|e| ImportError::Decode(e.to_string()))?;
        Ok(match parsed.id {
            Some(serde_json::Value::Number(n)) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty),
            Some(serde_json::Value::String(s)) => CellValue::Text(s),
            _ => CellValue::Empty,
        })
    }

    /// `Resultado`, then `Resultado_1`, `Resultado_2`, ... until one is free
    fn unique_result_name<H: DocumentHost + ?Sized>(&self, host: &mut H) -> Result<String, SheetError> {
        let mut candidate = RESULT_SHEET.to_string();
        let mut counter = 1;
        loop {
            let mut lookup = Transaction::new();
            let exists = lookup.sheet_exists(&candidate);
            if !lookup.sync(host)?.flag(exists)? {
                return Ok(candidate);
            }
            candidate = format!("{}_{}", RESULT_SHEET, counter);
            counter += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::testing::{ScriptedTransport, network_down, ok, status};
    use crate::workbook::PLACEHOLDER_SHEET;
    use crate::workbook::range::CellRef;
    use std::time::Duration;
    use tokio::time::Instant;

    fn workbook_with(a1: &str, b1: &str, a2: &str, b2: &str) -> Workbook {
        let mut wb = Workbook::new();
        let cell = |s: &str| {
            if s.is_empty() {
                CellValue::Empty
            } else {
                CellValue::text(s)
            }
        };
        let mut tx = Transaction::new();
        tx.set_values(
            PLACEHOLDER_SHEET,
            "A1:B2".parse().unwrap(),
            vec![vec![cell(a1), cell(b1)], vec![cell(a2), cell(b2)]],
        );
        tx.sync(&mut wb).unwrap();
        wb
    }

    fn importer(transport: Arc<ScriptedTransport>) -> Importer {
        Importer::new(transport, DEFAULT_IMPORT_URL, RetryConfig::default())
    }

    #[test]
    fn test_payload_validation() {
        let v = |rows: &[[&str; 2]]| -> Vec<Vec<CellValue>> {
            rows.iter()
                .map(|r| {
                    r.iter()
                        .map(|s| if s.is_empty() { CellValue::Empty } else { CellValue::text(*s) })
                        .collect()
                })
                .collect()
        };

        assert_eq!(
            payload_from_values(&v(&[["title", "body"]])),
            Err(ImportError::NotEnoughData)
        );
        assert_eq!(
            payload_from_values(&v(&[["title", ""], ["a", "b"]])),
            Err(ImportError::MissingHeaders)
        );
        assert_eq!(
            payload_from_values(&v(&[["title", "body"], ["", ""]])),
            Err(ImportError::NoData)
        );
        assert_eq!(
            payload_from_values(&v(&[["title", "body"], ["Hello", ""]])).unwrap(),
            ImportPayload {
                title: "Hello".to_string(),
                body: String::new(),
                user_id: 1
            }
        );
    }

    #[test]
    fn test_payload_serializes_camel_case() {
        let payload = ImportPayload {
            title: "t".into(),
            body: "b".into(),
            user_id: 1,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"title": "t", "body": "b", "userId": 1})
        );
    }

    #[tokio::test]
    async fn test_import_writes_result_sheet() {
        let transport = Arc::new(ScriptedTransport::new(vec![status(201, r#"{"id": 101}"#)]));
        let mut wb = workbook_with("title", "body", "Hello", "World");

        let receipt = importer(transport.clone())
            .import_active_row(&mut wb)
            .await
            .unwrap();

        assert_eq!(receipt.result_sheet, "Resultado");
        assert_eq!(receipt.remote_id, CellValue::Number(101.0));

        let request = &transport.requests()[0];
        assert_eq!(request.method, "POST");
        assert_eq!(
            request.body,
            Some(serde_json::json!({"title": "Hello", "body": "World", "userId": 1}))
        );

        let sheet = wb.sheet("Resultado").unwrap();
        assert_eq!(sheet.cell(CellRef::new(0, 1)), &CellValue::text("Estado"));
        assert_eq!(sheet.cell(CellRef::new(1, 0)), &CellValue::Number(101.0));
        assert_eq!(sheet.cell(CellRef::new(1, 1)), &CellValue::text(RESULT_STATUS));
        assert!(!sheet.cell(CellRef::new(1, 2)).is_empty());
    }

    #[tokio::test]
    async fn test_result_sheet_names_are_unique() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ok(r#"{"id": 1}"#),
            ok(r#"{"id": 2}"#),
            ok(r#"{"id": 3}"#),
        ]));
        let importer = importer(transport);
        let mut wb = workbook_with("title", "body", "a", "b");

        let mut names = Vec::new();
        for _ in 0..3 {
            names.push(importer.import_active_row(&mut wb).await.unwrap().result_sheet);
        }
        assert_eq!(names, vec!["Resultado", "Resultado_1", "Resultado_2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_status_is_retried_for_posts() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            status(503, "busy"),
            network_down(),
            ok(r#"{"id": 7}"#),
        ]));
        let mut wb = workbook_with("title", "body", "a", "b");
        let start = Instant::now();

        let receipt = importer(transport.clone())
            .import_active_row(&mut wb)
            .await
            .unwrap();

        assert_eq!(receipt.remote_id, CellValue::Number(7.0));
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_gives_up_after_three_attempts() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            status(500, ""),
            status(500, ""),
            status(500, ""),
        ]));
        let mut wb = workbook_with("title", "body", "a", "b");

        let err = importer(transport).import_active_row(&mut wb).await.unwrap_err();
        assert!(matches!(err, ImportError::SendFailed { attempts: 3, .. }));
        assert!(wb.sheet("Resultado").is_none());
    }

    #[test]
    fn test_result_sheet_names() {
        assert!(is_result_sheet("Resultado"));
        assert!(is_result_sheet("Resultado_12"));
        assert!(!is_result_sheet("Resultado_"));
        assert!(!is_result_sheet("Resultados"));
        assert!(!is_result_sheet("Accounts"));
    }

    #[tokio::test]
    async fn test_result_style_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        let transport = Arc::new(ScriptedTransport::new(vec![ok(r#"{"id": 5}"#)]));
        let mut wb = workbook_with("title", "body", "a", "b");
        importer(transport).import_active_row(&mut wb).await.unwrap();
        wb.save(&path).unwrap();

        let mut reopened = Workbook::open(&path).unwrap();
        assert_eq!(reopened.sheet("Resultado").unwrap().style_at(CellRef::new(0, 0)), None);

        restore_result_formats(&mut reopened).unwrap();
        let sheet = reopened.sheet("Resultado").unwrap();
        assert_eq!(sheet.style_at(CellRef::new(0, 2)), Some(result_header_style()));
        assert_eq!(sheet.style_at(CellRef::new(1, 0)), None);
        assert!(reopened.sheet(PLACEHOLDER_SHEET).unwrap().style_at(CellRef::new(0, 0)).is_none());
    }

    #[tokio::test]
    async fn test_validation_failure_sends_nothing() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let mut wb = workbook_with("", "body", "a", "b");

        let err = importer(transport.clone())
            .import_active_row(&mut wb)
            .await
            .unwrap_err();
        assert_eq!(err, ImportError::MissingHeaders);
        assert!(transport.requests().is_empty());
    }
}
