//! How each service field is rendered in the sheet
//!
//! The rule is picked by field name alone, never inferred from the data.

/// Change-tracking field the service adds to every record
pub const METADATA_FIELD: &str = "@odata.etag";

/// Identifier column, kept as text so long numbers do not turn scientific
pub const ID_FIELD: &str = "Id";

/// Display format for date columns
pub const DATE_FORMAT: &str = "DD/MM/YYYY";

pub use crate::workbook::TEXT_FORMAT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Never written
    Suppressed,
    /// `"true"` / `"false"` text
    Boolean,
    /// Spreadsheet serial date
    Date,
    /// Text with a leading marker
    Identifier,
    /// Value as received
    Passthrough,
}

const FIELD_RULES: &[(&str, FieldRule)] = &[
    (METADATA_FIELD, FieldRule::Suppressed),
    ("Active", FieldRule::Boolean),
    ("HasWarnings", FieldRule::Boolean),
    ("IsInterco", FieldRule::Boolean),
    ("CreationDateTime", FieldRule::Date),
    ("ModificationDateTime", FieldRule::Date),
    ("BankClosingDate", FieldRule::Date),
    ("CloseDate", FieldRule::Date),
    ("ValueDate", FieldRule::Date),
    ("TrnDate", FieldRule::Date),
    (ID_FIELD, FieldRule::Identifier),
];

pub fn rule_for(field: &str) -> FieldRule {
    FIELD_RULES
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, rule)| *rule)
        .unwrap_or(FieldRule::Passthrough)
}
