use std::fs;
use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use rust_xlsxwriter::{Format, Workbook};
use tracing::debug;

use crate::domain::CNPJ_DIGITS;
use crate::error::EnrichError;
use crate::record::{COLUMNS, CompanyRecord, TEXT_COLUMNS};

const CNPJ_COLUMN: &str = "cnpj";

/// Header is matched case-insensitively; empty cells are skipped.
pub fn extract_cnpjs(path: &Path) -> Result<Vec<String>, EnrichError> {
    let range = first_sheet(path)?;
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| EnrichError::MissingCnpjColumn(path.to_path_buf()))?;
    let column = header
        .iter()
        .position(|cell| cell.to_string().trim().to_lowercase() == CNPJ_COLUMN)
        .ok_or_else(|| EnrichError::MissingCnpjColumn(path.to_path_buf()))?;

    let mut values = Vec::new();
    for (index, row) in rows.enumerate() {
        match row.get(column).and_then(cell_text) {
            Some(value) => values.push(value),
            None => debug!(row = index + 2, "skipping empty cnpj cell"),
        }
    }
    Ok(values)
}

pub fn write_records(path: &Path, records: &[CompanyRecord]) -> Result<(), EnrichError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|err| EnrichError::Filesystem(err.to_string()))?;

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    for (col, name) in COLUMNS.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *name, &header_format)
            .map_err(xlsx_error)?;
    }
    for (index, record) in records.iter().enumerate() {
        let row = index as u32 + 1;
        for (col, value) in record.text_fields().iter().enumerate() {
            sheet
                .write_string(row, col as u16, *value)
                .map_err(xlsx_error)?;
        }
        let flags = [record.optante_simples, record.optante_simei];
        for (offset, flag) in flags.into_iter().enumerate() {
            if let Some(flag) = flag {
                sheet
                    .write_boolean(row, (TEXT_COLUMNS + offset) as u16, flag)
                    .map_err(xlsx_error)?;
            }
        }
    }

    let temp = tempfile::Builder::new()
        .prefix("cnpj-enrich-out")
        .suffix(".xlsx")
        .tempfile_in(parent)
        .map_err(|err| EnrichError::Filesystem(err.to_string()))?;
    workbook.save(temp.path()).map_err(xlsx_error)?;
    // Rename replaces the target on Unix but not on Windows.
    if cfg!(windows) && path.exists() {
        fs::remove_file(path).map_err(|err| EnrichError::Filesystem(err.to_string()))?;
    }
    temp.persist(path)
        .map_err(|err| EnrichError::Filesystem(err.to_string()))?;
    Ok(())
}

pub fn read_records(path: &Path) -> Result<Vec<CompanyRecord>, EnrichError> {
    let range = first_sheet(path)?;
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| EnrichError::Spreadsheet(format!("{} is empty", path.display())))?;
    let names = header
        .iter()
        .map(|cell| cell.to_string().trim().to_lowercase())
        .collect::<Vec<_>>();
    if names.len() < COLUMNS.len() || names[..COLUMNS.len()] != COLUMNS {
        return Err(EnrichError::Spreadsheet(format!(
            "{} does not have the expected output columns",
            path.display()
        )));
    }

    let mut records = Vec::new();
    for row in rows {
        let text: [String; TEXT_COLUMNS] = std::array::from_fn(|col| {
            row.get(col)
                .map(|cell| match cell {
                    Data::Empty => String::new(),
                    other => other.to_string(),
                })
                .unwrap_or_default()
        });
        if text.iter().all(|value| value.is_empty()) {
            continue;
        }
        let simples = row.get(TEXT_COLUMNS).and_then(cell_flag);
        let simei = row.get(TEXT_COLUMNS + 1).and_then(cell_flag);
        records.push(CompanyRecord::from_row(text, simples, simei));
    }
    Ok(records)
}

fn first_sheet(path: &Path) -> Result<Range<Data>, EnrichError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|err| EnrichError::Spreadsheet(format!("open {}: {err}", path.display())))?;
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| EnrichError::Spreadsheet(format!("{} has no worksheets", path.display())))?
        .map_err(|err| EnrichError::Spreadsheet(err.to_string()))
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(value) => {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        // Numeric CNPJ cells lose their leading zeros in the workbook.
        Data::Int(value) if *value >= 0 => Some(pad_digits(value.to_string())),
        Data::Float(value) if *value >= 0.0 && value.fract() == 0.0 => {
            Some(pad_digits(format!("{value:.0}")))
        }
        other => Some(other.to_string()),
    }
}

fn cell_flag(cell: &Data) -> Option<bool> {
    match cell {
        Data::Bool(value) => Some(*value),
        Data::String(value) => value.trim().to_lowercase().parse().ok(),
        _ => None,
    }
}

fn pad_digits(digits: String) -> String {
    format!("{digits:0>width$}", width = CNPJ_DIGITS)
}

fn xlsx_error(err: rust_xlsxwriter::XlsxError) -> EnrichError {
    EnrichError::Spreadsheet(err.to_string())
}
