//! Service records to a header row plus display rows

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::fields::{FieldRule, METADATA_FIELD, rule_for};
use crate::api::RawRecord;
use crate::workbook::{CellValue, TEXT_MARKER};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Unix milliseconds of 1899-12-30T00:00:00Z, the spreadsheet's day zero
///
/// One day before the nominal 1900-01-01 epoch, which absorbs the fictitious
/// 1900-02-29 for every date from March 1900 on.
const SERIAL_EPOCH_MILLIS: i64 = -2_209_161_600_000;

/// Largest distance from the Unix epoch a timestamp may have, in milliseconds
const MAX_TIMESTAMP_MILLIS: f64 = 8_640_000_000_000_000.0;

/// Rectangular output: one header row and one row per record
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Grid {
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Header row followed by the data rows
    pub fn to_values(&self) -> Vec<Vec<CellValue>> {
        let mut values = Vec::with_capacity(self.rows.len() + 1);
        values.push(self.headers.iter().map(|h| CellValue::text(h.as_str())).collect());
        values.extend(self.rows.iter().cloned());
        values
    }
}

/// Build the grid for `records`
///
/// With a field selection the columns are exactly those fields in that order;
/// otherwise they are the first record's keys without the metadata field.
pub fn to_grid(records: &[RawRecord], selected_fields: &[String]) -> Grid {
    let headers: Vec<String> = if !selected_fields.is_empty() {
        selected_fields.to_vec()
    } else {
        records
            .first()
            .map(|first| {
                first
                    .keys()
                    .filter(|key| key.as_str() != METADATA_FIELD)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    };

    let rules: Vec<FieldRule> = headers.iter().map(|h| rule_for(h)).collect();

    let rows = records
        .iter()
        .map(|record| {
            headers
                .iter()
                .zip(&rules)
                .map(|(field, rule)| format_cell(*rule, record.get(field)))
                .collect()
        })
        .collect();

    Grid { headers, rows }
}

/// Apply one field rule to a raw value
pub fn format_cell(rule: FieldRule, value: Option<&Value>) -> CellValue {
    match rule {
        FieldRule::Suppressed => CellValue::Empty,
        FieldRule::Boolean => match value {
            Some(Value::Bool(true)) => CellValue::text("true"),
            Some(Value::Bool(false)) => CellValue::text("false"),
            _ => CellValue::Empty,
        },
        FieldRule::Date => match value.and_then(date_millis) {
            Some(millis) => CellValue::Number(to_serial(millis)),
            None => {
                if let Some(raw) = value.filter(|v| !is_blank(v)) {
                    log::warn!("Invalid date value: {}", raw);
                }
                CellValue::Empty
            }
        },
        FieldRule::Identifier => match value {
            None | Some(Value::Null) => CellValue::Empty,
            Some(v) => CellValue::Text(format!("{}{}", TEXT_MARKER, scalar_text(v))),
        },
        FieldRule::Passthrough => match value {
            None | Some(Value::Null) => CellValue::Empty,
            Some(Value::Bool(b)) => CellValue::Bool(*b),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(CellValue::Number)
                .unwrap_or_else(|| CellValue::Text(n.to_string())),
            Some(Value::String(s)) if s.is_empty() => CellValue::Empty,
            Some(Value::String(s)) => CellValue::Text(s.clone()),
            Some(other) => CellValue::Text(other.to_string()),
        },
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Spreadsheet serial number for a Unix timestamp in milliseconds
pub fn to_serial(millis: i64) -> f64 {
    (millis as f64 - SERIAL_EPOCH_MILLIS as f64) / MILLIS_PER_DAY
}

/// Unix milliseconds for a date value, `None` when blank or unparseable
///
/// Strings may be RFC 3339 timestamps, naive timestamps (read as UTC) or bare
/// dates; non-zero numbers within ±8.64e15 are taken as Unix milliseconds.
pub fn date_millis(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => parse_date_str(s.trim()),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| *f != 0.0 && f.abs() <= MAX_TIMESTAMP_MILLIS)
            .map(|f| f as i64),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<i64> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_accounts_scenario() {
        let records = vec![
            record(json!({"Id": 1, "Active": true})),
            record(json!({"Id": 2, "Active": false})),
        ];
        let grid = to_grid(&records, &[]);

        assert_eq!(grid.headers, vec!["Id", "Active"]);
        assert_eq!(
            grid.rows,
            vec![
                vec![CellValue::text("'1"), CellValue::text("true")],
                vec![CellValue::text("'2"), CellValue::text("false")],
            ]
        );
    }

    #[test]
    fn test_metadata_field_dropped_from_headers() {
        let records = vec![record(json!({
            "@odata.etag": "W/\"123\"",
            "Code": "A1",
            "Name": "Main"
        }))];
        let grid = to_grid(&records, &[]);
        assert_eq!(grid.headers, vec!["Code", "Name"]);
        assert_eq!(
            grid.rows[0],
            vec![CellValue::text("A1"), CellValue::text("Main")]
        );
    }

    #[test]
    fn test_selected_fields_drive_columns() {
        let records = vec![record(json!({"Amount": 10.5, "Id": 7, "Extra": "x"}))];
        let selected = vec!["Id".to_string(), "Amount".to_string(), "Missing".to_string()];
        let grid = to_grid(&records, &selected);

        assert_eq!(grid.headers, selected);
        assert_eq!(
            grid.rows[0],
            vec![CellValue::text("'7"), CellValue::Number(10.5), CellValue::Empty]
        );
    }

    #[test]
    fn test_to_grid_is_idempotent() {
        let records = vec![
            record(json!({"Id": 1, "TrnDate": "2024-01-15", "Active": null})),
            record(json!({"Id": 2, "TrnDate": "garbage", "Active": true})),
        ];
        assert_eq!(to_grid(&records, &[]), to_grid(&records, &[]));
    }

    #[test]
    fn test_identifier_keeps_digits() {
        assert_eq!(
            format_cell(FieldRule::Identifier, Some(&json!(123456789012345u64))),
            CellValue::text("'123456789012345")
        );
        assert_eq!(
            format_cell(FieldRule::Identifier, Some(&json!("ABC-9"))),
            CellValue::text("'ABC-9")
        );
        assert_eq!(format_cell(FieldRule::Identifier, None), CellValue::Empty);
        assert_eq!(
            format_cell(FieldRule::Identifier, Some(&Value::Null)),
            CellValue::Empty
        );
    }

    #[test]
    fn test_boolean_only_accepts_real_booleans() {
        assert_eq!(
            format_cell(FieldRule::Boolean, Some(&json!(true))),
            CellValue::text("true")
        );
        assert_eq!(format_cell(FieldRule::Boolean, Some(&json!("true"))), CellValue::Empty);
        assert_eq!(format_cell(FieldRule::Boolean, Some(&json!(1))), CellValue::Empty);
        assert_eq!(format_cell(FieldRule::Boolean, None), CellValue::Empty);
    }

    #[test]
    fn test_date_serials() {
        // 1970-01-01 is serial 25569
        assert_eq!(to_serial(0), 25569.0);
        assert_eq!(
            format_cell(FieldRule::Date, Some(&json!("2024-01-15"))),
            CellValue::Number(45306.0)
        );
        assert_eq!(
            format_cell(FieldRule::Date, Some(&json!("2024-01-15T12:00:00Z"))),
            CellValue::Number(45306.5)
        );
        assert_eq!(
            format_cell(FieldRule::Date, Some(&json!("2024-01-15T18:00:00"))),
            CellValue::Number(45306.75)
        );
        assert_eq!(
            format_cell(FieldRule::Date, Some(&json!("2024-01-16T02:00:00+02:00"))),
            CellValue::Number(45307.0)
        );
    }

    #[test]
    fn test_invalid_dates_are_empty() {
        for value in [json!(""), json!("  "), json!("not a date"), json!(null), json!(0), json!(false)] {
            assert_eq!(format_cell(FieldRule::Date, Some(&value)), CellValue::Empty, "{}", value);
        }
        assert_eq!(format_cell(FieldRule::Date, None), CellValue::Empty);
    }

    #[test]
    fn test_out_of_range_timestamps_are_empty() {
        for value in [json!(1e19), json!(1e17), json!(-1e19), json!(u64::MAX), json!(i64::MIN)] {
            assert_eq!(format_cell(FieldRule::Date, Some(&value)), CellValue::Empty, "{}", value);
        }
        // The bounds themselves are still dates
        assert!(matches!(
            format_cell(FieldRule::Date, Some(&json!(8_640_000_000_000_000i64))),
            CellValue::Number(n) if n.is_finite()
        ));
        assert_eq!(
            format_cell(FieldRule::Date, Some(&json!(86_400_000))),
            CellValue::Number(25570.0)
        );
        assert!(to_serial(i64::MAX).is_finite());
    }

    #[test]
    fn test_date_serials_are_finite() {
        for input in ["1900-03-01", "1999-12-31T23:59:59.999Z", "2100-06-30"] {
            match format_cell(FieldRule::Date, Some(&json!(input))) {
                CellValue::Number(n) => assert!(n.is_finite(), "{}", input),
                other => panic!("{} gave {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_passthrough_nested_values() {
        assert_eq!(
            format_cell(FieldRule::Passthrough, Some(&json!({"Code": "F01"}))),
            CellValue::text(r#"{"Code":"F01"}"#)
        );
        assert_eq!(
            format_cell(FieldRule::Passthrough, Some(&json!(false))),
            CellValue::Bool(false)
        );
        assert_eq!(format_cell(FieldRule::Passthrough, Some(&json!(""))), CellValue::Empty);
    }
}
