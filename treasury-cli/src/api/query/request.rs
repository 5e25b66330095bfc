//! What a download asks for, and the checks it must pass before it is sent

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

/// Plain OData property name; anything else could smuggle extra clauses
static FIELD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid field name regex"));

/// The record sets that can be downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Accounts,
    FlowCodes,
    CashFlows,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 3] = [
        DatasetKind::Accounts,
        DatasetKind::FlowCodes,
        DatasetKind::CashFlows,
    ];

    /// OData entity set the records come from
    pub fn entity_set(&self) -> &'static str {
        match self {
            DatasetKind::Accounts => "AccountSet",
            DatasetKind::FlowCodes => "FlowCodeSet",
            DatasetKind::CashFlows => "CashFlowSet",
        }
    }

    /// Worksheet the records are written to
    pub fn sheet_name(&self) -> &'static str {
        match self {
            DatasetKind::Accounts => "Accounts",
            DatasetKind::FlowCodes => "Flujos",
            DatasetKind::CashFlows => "Movimientos",
        }
    }

    /// Whether the download needs an explicit field selection
    pub fn requires_fields(&self) -> bool {
        matches!(self, DatasetKind::CashFlows)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Accounts => write!(f, "accounts"),
            DatasetKind::FlowCodes => write!(f, "flow codes"),
            DatasetKind::CashFlows => write!(f, "cash flows"),
        }
    }
}

impl FromStr for DatasetKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accounts" | "cuentas" => Ok(DatasetKind::Accounts),
            "flow-codes" | "flowcodes" | "flujos" => Ok(DatasetKind::FlowCodes),
            "cash-flows" | "cashflows" | "movimientos" => Ok(DatasetKind::CashFlows),
            _ => Err(ValidationError::UnknownDataset(s.to_string())),
        }
    }
}

/// How many records to ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLimit {
    Bounded(NonZeroU32),
    Unbounded,
}

impl RecordLimit {
    pub fn bounded(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(RecordLimit::Bounded)
    }

    /// Value for `$top`, if any
    pub fn as_top(&self) -> Option<u32> {
        match self {
            RecordLimit::Bounded(n) => Some(n.get()),
            RecordLimit::Unbounded => None,
        }
    }
}

impl Default for RecordLimit {
    fn default() -> Self {
        RecordLimit::Bounded(NonZeroU32::new(50).unwrap_or(NonZeroU32::MIN))
    }
}

impl fmt::Display for RecordLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordLimit::Bounded(n) => write!(f, "{}", n),
            RecordLimit::Unbounded => write!(f, "all"),
        }
    }
}

impl FromStr for RecordLimit {
    type Err = ValidationError;

    /// `all` or a positive integer
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(RecordLimit::Unbounded);
        }
        s.parse::<u32>()
            .ok()
            .and_then(RecordLimit::bounded)
            .ok_or_else(|| ValidationError::InvalidLimit(s.to_string()))
    }
}

/// Problems with a download request caught before any request is made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    UnknownDataset(String),
    InvalidLimit(String),
    /// Cash flows were requested without choosing any field
    NoFieldsSelected,
    InvalidField(String),
    FieldNotAllowed(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnknownDataset(s) => write!(
                f,
                "unknown dataset '{}' (expected accounts, flow-codes or cash-flows)",
                s
            ),
            ValidationError::InvalidLimit(s) => write!(
                f,
                "invalid record limit '{}' (expected a positive number or 'all')",
                s
            ),
            ValidationError::NoFieldsSelected => write!(f, "select at least one field"),
            ValidationError::InvalidField(s) => write!(f, "'{}' is not a valid field name", s),
            ValidationError::FieldNotAllowed(s) => {
                write!(f, "field '{}' is not available for download", s)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// A single download: dataset, page size and projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub kind: DatasetKind,
    pub limit: RecordLimit,
    pub fields: Vec<String>,
}

impl DownloadRequest {
    pub fn new(kind: DatasetKind, limit: RecordLimit, fields: Vec<String>) -> Self {
        Self {
            kind,
            limit,
            fields,
        }
    }

    /// Fields that shape the query and the sheet
    ///
    /// Only cash flows take a selection; it is ignored for the other sets.
    pub fn effective_fields(&self) -> &[String] {
        if self.kind.requires_fields() {
            &self.fields
        } else {
            &[]
        }
    }

    /// Check the selection against naming rules and the optional allow-list
    pub fn validate(&self, allow_list: &[String]) -> Result<(), ValidationError> {
        if !self.kind.requires_fields() {
            return Ok(());
        }
        if self.fields.is_empty() {
            return Err(ValidationError::NoFieldsSelected);
        }
        for field in &self.fields {
            if !FIELD_NAME.is_match(field) {
                return Err(ValidationError::InvalidField(field.clone()));
            }
            if !allow_list.is_empty() && !allow_list.iter().any(|a| a == field) {
                return Err(ValidationError::FieldNotAllowed(field.clone()));
            }
        }
        Ok(())
    }
}

/// Split a comma separated field list, dropping blanks and duplicates
pub fn parse_field_list(input: &str) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for field in input.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        if !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_dataset_kind() {
        assert_eq!("accounts".parse(), Ok(DatasetKind::Accounts));
        assert_eq!("Flujos".parse(), Ok(DatasetKind::FlowCodes));
        assert_eq!("cash-flows".parse(), Ok(DatasetKind::CashFlows));
        assert!("ledger".parse::<DatasetKind>().is_err());
    }

    #[test]
    fn test_parse_record_limit() {
        assert_eq!("all".parse(), Ok(RecordLimit::Unbounded));
        assert_eq!("ALL".parse(), Ok(RecordLimit::Unbounded));
        assert_eq!("50".parse(), Ok(RecordLimit::bounded(50).unwrap()));
        assert_eq!(
            "0".parse::<RecordLimit>(),
            Err(ValidationError::InvalidLimit("0".to_string()))
        );
        assert!("-3".parse::<RecordLimit>().is_err());
        assert!("fifty".parse::<RecordLimit>().is_err());
        assert_eq!(RecordLimit::default().as_top(), Some(50));
    }

    #[test]
    fn test_cash_flows_need_fields() {
        let request = DownloadRequest::new(DatasetKind::CashFlows, RecordLimit::Unbounded, vec![]);
        assert_eq!(request.validate(&[]), Err(ValidationError::NoFieldsSelected));

        let request = DownloadRequest::new(DatasetKind::Accounts, RecordLimit::Unbounded, vec![]);
        assert_eq!(request.validate(&[]), Ok(()));
    }

    #[test]
    fn test_field_names_are_checked() {
        let request = DownloadRequest::new(
            DatasetKind::CashFlows,
            RecordLimit::Unbounded,
            fields(&["Id", "Amount&$filter=1"]),
        );
        assert_eq!(
            request.validate(&[]),
            Err(ValidationError::InvalidField("Amount&$filter=1".to_string()))
        );
    }

    #[test]
    fn test_allow_list() {
        let allow = fields(&["Id", "Amount"]);
        let ok = DownloadRequest::new(
            DatasetKind::CashFlows,
            RecordLimit::Unbounded,
            fields(&["Amount"]),
        );
        assert_eq!(ok.validate(&allow), Ok(()));

        let denied = DownloadRequest::new(
            DatasetKind::CashFlows,
            RecordLimit::Unbounded,
            fields(&["Id", "Secret"]),
        );
        assert_eq!(
            denied.validate(&allow),
            Err(ValidationError::FieldNotAllowed("Secret".to_string()))
        );
    }

    #[test]
    fn test_fields_ignored_outside_cash_flows() {
        let request = DownloadRequest::new(
            DatasetKind::FlowCodes,
            RecordLimit::Unbounded,
            fields(&["Code"]),
        );
        assert!(request.effective_fields().is_empty());
    }

    #[test]
    fn test_parse_field_list() {
        assert_eq!(
            parse_field_list(" Id, TrnDate,,Id ,Amount "),
            fields(&["Id", "TrnDate", "Amount"])
        );
        assert!(parse_field_list("").is_empty());
    }
}
