//! Terminal notifications
//!
//! Every command ends with exactly one notification: a green success line or
//! a red error line whose text is written for the person at the keyboard.

use colored::*;

use crate::api::{AuthError, FetchError, ValidationError};
use crate::export::DownloadError;
use crate::import::ImportError;
use crate::workbook::SheetError;

pub fn success(message: &str) {
    println!("{} {}", "✓".bright_green().bold(), message.bright_green());
}

pub fn error(message: &str) {
    eprintln!("{} {}", "✗".bright_red().bold(), message.bright_red());
}

/// User-facing text for a failed command
pub fn describe(error: &anyhow::Error) -> String {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<DownloadError>() {
            return match e {
                DownloadError::Validation(e) => describe_validation(e),
                DownloadError::Fetch(e) => describe_fetch(e),
                DownloadError::Sheet(e) => describe_sheet(e),
            };
        }
        if let Some(e) = cause.downcast_ref::<AuthError>() {
            return describe_auth(e);
        }
        if let Some(e) = cause.downcast_ref::<ImportError>() {
            return describe_import(e);
        }
        if let Some(e) = cause.downcast_ref::<ValidationError>() {
            return describe_validation(e);
        }
        if let Some(e) = cause.downcast_ref::<SheetError>() {
            return describe_sheet(e);
        }
    }
    format!("{:#}", error)
}

fn describe_auth(error: &AuthError) -> String {
    match error {
        AuthError::Unreachable(_) => {
            "Connection error: the server could not be reached. Check that it is running.".to_string()
        }
        AuthError::Rejected { .. } => "Invalid username or password.".to_string(),
        other => capitalize(&other.to_string()),
    }
}

fn describe_fetch(error: &FetchError) -> String {
    match error {
        FetchError::RetriesExhausted { attempts, .. } => format!(
            "Connection error: no response from the server after {} attempts.",
            attempts
        ),
        FetchError::EmptyResult => "No data was received from the server.".to_string(),
        FetchError::Auth(e) => describe_auth(e),
        other => format!("Error downloading data: {}", other),
    }
}

fn describe_sheet(error: &SheetError) -> String {
    match error {
        SheetError::Protected { sheet } => format!(
            "The sheet '{}' is protected. Unprotect it and try again.",
            sheet
        ),
        other => format!("Error writing to the workbook: {}", other),
    }
}

fn describe_validation(error: &ValidationError) -> String {
    match error {
        ValidationError::NoFieldsSelected => {
            "Select at least one field for cash flows (--fields).".to_string()
        }
        other => capitalize(&other.to_string()),
    }
}

fn describe_import(error: &ImportError) -> String {
    match error {
        ImportError::SendFailed { attempts, .. } => format!(
            "Error sending data: the import failed after {} attempts.",
            attempts
        ),
        ImportError::Sheet(e) => describe_sheet(e),
        other => capitalize(&other.to_string()),
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::TransportError;
    use anyhow::Context;

    #[test]
    fn test_protected_sheet_message() {
        let err: anyhow::Error = DownloadError::Sheet(SheetError::Protected {
            sheet: "Accounts".to_string(),
        })
        .into();
        assert_eq!(
            describe(&err),
            "The sheet 'Accounts' is protected. Unprotect it and try again."
        );
    }

    #[test]
    fn test_message_found_through_context() {
        let result: Result<(), FetchError> = Err(FetchError::RetriesExhausted {
            attempts: 3,
            last: TransportError::new("connection refused"),
        });
        let err = result
            .map_err(DownloadError::from)
            .context("Download failed")
            .unwrap_err();
        assert_eq!(
            describe(&err),
            "Connection error: no response from the server after 3 attempts."
        );
    }

    #[test]
    fn test_validation_and_import_messages() {
        let err: anyhow::Error = DownloadError::Validation(ValidationError::NoFieldsSelected).into();
        assert_eq!(
            describe(&err),
            "Select at least one field for cash flows (--fields)."
        );

        let err: anyhow::Error = ImportError::MissingHeaders.into();
        assert_eq!(describe(&err), "Headers are required in A1 and B1");
    }

    #[test]
    fn test_other_errors_keep_their_chain() {
        let err = anyhow::anyhow!("disk full").context("Failed to save workbook");
        assert_eq!(describe(&err), "Failed to save workbook: disk full");
    }
}
