//! Commit a grid to its output sheet

use log::{debug, info};

use super::fields::{DATE_FORMAT, FieldRule, TEXT_FORMAT, rule_for};
use super::transform::Grid;
use crate::api::DatasetKind;
use crate::workbook::{
    CellRange, CellValue, DocumentHost, PLACEHOLDER_SHEET, RangeStyle, SheetError, TEXT_MARKER,
    Transaction, Workbook, column_letter,
};

const HEADER_FILL: &str = "#4472C4";
const HEADER_FONT: &str = "#FFFFFF";

/// Header row style of downloaded sheets
pub fn header_style() -> RangeStyle {
    RangeStyle {
        fill: Some(HEADER_FILL.to_string()),
        bold: true,
        font_color: Some(HEADER_FONT.to_string()),
    }
}

/// Replace `sheet_name` with a freshly formatted sheet holding `grid`
///
/// Runs as three flushes: look up the existing sheets, recreate the target
/// and check its protection, then write and format everything at once.
pub fn write_grid<H: DocumentHost + ?Sized>(
    host: &mut H,
    sheet_name: &str,
    grid: &Grid,
) -> Result<(), SheetError> {
    let block = CellRange::from_origin(grid.rows.len() + 1, grid.column_count())
        .ok_or(SheetError::EmptyGrid)?;

    let mut lookup = Transaction::new();
    lookup.suspend_screen_updating();
    let existing = lookup.sheet_exists(sheet_name);
    let placeholder = lookup.sheet_exists(PLACEHOLDER_SHEET);
    let found = lookup.sync(host)?;

    let is_placeholder = sheet_name.eq_ignore_ascii_case(PLACEHOLDER_SHEET);
    let mut placeholder_present = found.flag(placeholder)?;

    let mut recreate = Transaction::new();
    if found.flag(existing)? {
        debug!("Replacing existing sheet '{}'", sheet_name);
        // A workbook cannot lose its last sheet
        if !placeholder_present && !is_placeholder {
            recreate.add_sheet(PLACEHOLDER_SHEET);
            placeholder_present = true;
        }
        recreate.delete_sheet(sheet_name);
    }
    recreate.add_sheet(sheet_name);
    let protected = recreate.is_protected(sheet_name);
    let created = recreate.sync(host)?;

    if created.flag(protected)? {
        return Err(SheetError::Protected {
            sheet: sheet_name.to_string(),
        });
    }

    let mut write = Transaction::new();
    write.suspend_screen_updating();
    if placeholder_present && !is_placeholder {
        debug!("Removing placeholder sheet '{}'", PLACEHOLDER_SHEET);
        write.delete_sheet(PLACEHOLDER_SHEET);
    }

    write.set_values(sheet_name, block, grid.to_values());

    stage_column_formats(&mut write, sheet_name, block, &grid.headers);

    write.activate(sheet_name);
    write.sync(host)?;

    info!("Wrote {} to sheet '{}'", block, sheet_name);
    Ok(())
}

/// Header style, per-column number formats and autofit for a written block
fn stage_column_formats(tx: &mut Transaction, sheet_name: &str, block: CellRange, headers: &[String]) {
    tx.style(sheet_name, block.first_row(), header_style());

    let last_row = block.end.row;
    if last_row > 0 {
        for (col, header) in headers.iter().enumerate() {
            let format = match rule_for(header) {
                FieldRule::Date => DATE_FORMAT,
                FieldRule::Identifier => TEXT_FORMAT,
                _ => continue,
            };
            let range = CellRange::column(col as u16, 1, last_row);
            debug!("Format {} on column {} ({})", format, column_letter(col as u16), header);
            tx.number_format(sheet_name, range, format);
        }
    }

    tx.autofit(sheet_name, block);
}

/// Put back the formatting of dataset sheets loaded from a file
///
/// Only values survive a save and reopen. Formats are derived again from the
/// header row, and identifier cells get their text marker back.
pub fn restore_formats(workbook: &mut Workbook) -> Result<(), SheetError> {
    for kind in DatasetKind::ALL {
        let sheet_name = kind.sheet_name();
        let Some(sheet) = workbook.sheet(sheet_name) else {
            continue;
        };
        let Some(block) = sheet.used_range() else {
            continue;
        };

        let headers: Vec<String> = sheet
            .values(block.first_row())
            .into_iter()
            .flatten()
            .map(|value| value.to_string())
            .collect();

        let mut tx = Transaction::new();
        if block.end.row > 0 {
            for (col, header) in headers.iter().enumerate() {
                if rule_for(header) != FieldRule::Identifier {
                    continue;
                }
                let range = CellRange::column(col as u16, 1, block.end.row);
                let values = sheet
                    .values(range)
                    .into_iter()
                    .map(|row| row.into_iter().map(with_text_marker).collect())
                    .collect();
                tx.set_values(sheet_name, range, values);
            }
        }
        stage_column_formats(&mut tx, sheet_name, block, &headers);

        debug!("Restoring formats of sheet '{}'", sheet_name);
        tx.sync(workbook)?;
    }
    Ok(())
}

fn with_text_marker(value: CellValue) -> CellValue {
    match value {
        CellValue::Text(s) if s.starts_with(TEXT_MARKER) => CellValue::Text(s),
        CellValue::Empty => CellValue::Empty,
        other => CellValue::Text(format!("{}{}", TEXT_MARKER, other)),
    }
}
