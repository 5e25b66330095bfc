//! Load and save workbook documents as .xlsx files

use std::path::Path;

use anyhow::{Context, Result};
use calamine::{Data, Reader, Xlsx, open_workbook};
use rust_xlsxwriter::{Color, Format, Worksheet};

use super::document::{CellValue, RangeStyle, Sheet, Workbook};
use super::range::CellRef;

/// Leading character that forces Excel to keep a value as text
pub const TEXT_MARKER: char = '\'';

/// Number format of text cells; only these turn a leading marker into a quote prefix
pub const TEXT_FORMAT: &str = "@";

impl Workbook {
    /// Open an existing workbook, or start a fresh one when the file is missing
    ///
    /// Only cell values survive the round trip; formatting and protection are
    /// not read back.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!(
                "Workbook {} not found, starting a new one",
                path.display()
            );
            return Ok(Workbook::new());
        }

        let mut xlsx: Xlsx<_> = open_workbook(path)
            .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;

        let sheet_names: Vec<String> = xlsx.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(sheet_names.len());

        for sheet_name in sheet_names {
            let range = xlsx
                .worksheet_range(&sheet_name)
                .with_context(|| format!("Failed to read sheet '{}'", sheet_name))?;

            let mut sheet = Sheet::new(&sheet_name);
            let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
            for (row, col, data) in range.cells() {
                let cell = CellRef::new(row_offset + row as u32, (col_offset as usize + col) as u16);
                sheet.set_cell(cell, data_to_cell(data));
            }
            log::debug!("Loaded sheet '{}'", sheet_name);
            sheets.push(sheet);
        }

        Ok(Workbook::from_sheets(sheets))
    }

    /// Write every sheet, with its formatting, to an .xlsx file
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut workbook = rust_xlsxwriter::Workbook::new();

        for (index, sheet) in self.sheets().iter().enumerate() {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(sheet.name())?;
            write_sheet(worksheet, sheet)
                .with_context(|| format!("Failed to write sheet '{}'", sheet.name()))?;

            if index == self.active_index() {
                worksheet.set_active(true);
            }
            if sheet.is_protected() {
                worksheet.protect();
            }
        }

        workbook
            .save(path)
            .with_context(|| format!("Failed to save Excel file: {}", path.display()))?;

        log::info!("Workbook saved to: {}", path.display());
        Ok(())
    }
}

fn write_sheet(ws: &mut Worksheet, sheet: &Sheet) -> Result<()> {
    for (cell, value) in sheet.cells() {
        let text_cell = sheet.number_format_at(*cell) == Some(TEXT_FORMAT);
        let (text, quoted) = match value {
            CellValue::Text(s) if text_cell => match s.strip_prefix(TEXT_MARKER) {
                Some(rest) => (Some(rest), true),
                None => (Some(s.as_str()), false),
            },
            CellValue::Text(s) => (Some(s.as_str()), false),
            _ => (None, false),
        };

        let format = cell_format(sheet, *cell, quoted);
        match (value, format) {
            (CellValue::Empty, _) => {}
            (CellValue::Text(_), Some(f)) => {
                ws.write_string_with_format(cell.row, cell.col, text.unwrap_or_default(), &f)?;
            }
            (CellValue::Text(_), None) => {
                ws.write_string(cell.row, cell.col, text.unwrap_or_default())?;
            }
            (CellValue::Number(n), Some(f)) => {
                ws.write_number_with_format(cell.row, cell.col, *n, &f)?;
            }
            (CellValue::Number(n), None) => {
                ws.write_number(cell.row, cell.col, *n)?;
            }
            (CellValue::Bool(b), Some(f)) => {
                ws.write_boolean_with_format(cell.row, cell.col, *b, &f)?;
            }
            (CellValue::Bool(b), None) => {
                ws.write_boolean(cell.row, cell.col, *b)?;
            }
        }
    }

    // Formatted cells without a value still carry their format
    for cell in sheet.formatted_cells() {
        if sheet.cell(cell).is_empty() {
            if let Some(format) = cell_format(sheet, cell, false) {
                ws.write_blank(cell.row, cell.col, &format)?;
            }
        }
    }

    if !sheet.autofit_ranges().is_empty() {
        ws.autofit();
    }
    Ok(())
}

fn cell_format(sheet: &Sheet, cell: CellRef, quoted: bool) -> Option<Format> {
    let style = sheet.style_at(cell);
    let number_format = sheet.number_format_at(cell);
    if style.is_none() && number_format.is_none() && !quoted {
        return None;
    }

    let mut format = Format::new();
    if let Some(style) = style {
        format = apply_style(format, &style);
    }
    if let Some(num_format) = number_format {
        format = format.set_num_format(num_format);
    }
    if quoted {
        format = format.set_quote_prefix();
    }
    Some(format)
}

fn apply_style(mut format: Format, style: &RangeStyle) -> Format {
    if let Some(fill) = style.fill.as_deref().and_then(parse_hex_color) {
        format = format.set_background_color(fill);
    }
    if let Some(font) = style.font_color.as_deref().and_then(parse_hex_color) {
        format = format.set_font_color(font);
    }
    if style.bold {
        format = format.set_bold();
    }
    format
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok().map(Color::RGB)
}

fn data_to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}
