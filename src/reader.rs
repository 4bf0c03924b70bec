use crate::error::{Error, Result};
use crate::table::{CellValue, Table};
use ssfmt::{FormatOptions, NumberFormat};
use std::path::Path;
use umya_spreadsheet::structs::Worksheet;
use umya_spreadsheet::Spreadsheet;

pub fn open_workbook(path: &Path) -> Result<Spreadsheet> {
    if !path.exists() {
        return Err(Error::InputNotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" | "xlsm" => open_xlsx(path),
        "xls" => open_xls(path),
        _ => Err(Error::UnsupportedFormat(extension)),
    }
}

fn open_xlsx(path: &Path) -> Result<Spreadsheet> {
    umya_spreadsheet::reader::xlsx::read(path).map_err(|e| Error::InvalidExcel {
        path: path.to_path_buf(),
        details: e.to_string(),
    })
}

fn open_xls(path: &Path) -> Result<Spreadsheet> {
    xlrd::open(path).map_err(|e| Error::InvalidExcel {
        path: path.to_path_buf(),
        details: e.to_string(),
    })
}

pub fn sheet_names(book: &Spreadsheet) -> Vec<String> {
    book.get_sheet_collection()
        .iter()
        .map(|s| s.get_name().to_string())
        .collect()
}

/// Read a sheet whose first row holds the column headers.
pub fn read_table(book: &Spreadsheet, name: &str) -> Result<Table> {
    let sheet = book
        .get_sheet_by_name(name)
        .ok_or_else(|| Error::SheetNotFound {
            name: name.to_string(),
            available: sheet_names(book).join(", "),
        })?;
    Ok(sheet_to_table(sheet))
}

pub fn read_first_table(book: &Spreadsheet) -> Result<Table> {
    let sheet = book.get_sheet(&0).ok_or_else(|| Error::SheetNotFound {
        name: "#0".to_string(),
        available: String::new(),
    })?;
    Ok(sheet_to_table(sheet))
}

fn sheet_to_table(sheet: &Worksheet) -> Table {
    let (max_col, max_row) = sheet.get_highest_column_and_row();
    let opts = FormatOptions::default();

    let headers = (1..=max_col)
        .map(|col| get_cell_formatted_value(sheet, col, 1, &opts).trim().to_string())
        .collect();
    let mut table = Table::new(sheet.get_name(), headers);

    for row in 2..=max_row {
        let record = (1..=max_col)
            .map(|col| {
                let value = get_cell_formatted_value(sheet, col, row, &opts);
                if value.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(value)
                }
            })
            .collect();
        table.push_row(record);
    }

    while table.rows.last().is_some_and(|r| r.iter().all(CellValue::is_empty)) {
        table.rows.pop();
    }

    table
}

/// Get a cell's formatted value using ssfmt for proper Excel format code support.
fn get_cell_formatted_value(sheet: &Worksheet, col: u32, row: u32, opts: &FormatOptions) -> String {
    let Some(cell) = sheet.get_cell((col, row)) else {
        return String::new();
    };

    let raw_value = cell.get_value();
    if raw_value.is_empty() {
        return String::new();
    }

    let format_code = cell
        .get_style()
        .get_number_format()
        .map(|nf| nf.get_format_code())
        .unwrap_or("General");

    let fmt = match NumberFormat::parse(format_code) {
        Ok(f) => f,
        Err(_) => return raw_value.to_string(),
    };

    // Dates are serial numbers, so they go through the numeric path too.
    if let Ok(num) = raw_value.parse::<f64>() {
        return fmt.format(num, opts);
    }

    fmt.format_text(&raw_value, opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let err = open_workbook(Path::new("no_such_roster.xlsx")).unwrap_err();
        assert!(matches!(err, Error::InputNotFound(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.ods");
        std::fs::write(&path, b"").unwrap();
        assert!(matches!(open_workbook(&path), Err(Error::UnsupportedFormat(ext)) if ext == "ods"));
    }

    #[test]
    fn test_sheet_to_table() {
        let mut book = umya_spreadsheet::new_file();
        {
            let sheet = book.get_sheet_mut(&0).unwrap();
            sheet.set_name("IT");
            sheet.get_cell_mut("A1").set_value("工號");
            sheet.get_cell_mut("B1").set_value("姓名");
            sheet.get_cell_mut("A2").set_value("A001");
            sheet.get_cell_mut("B2").set_value("Amy");
            sheet.get_cell_mut("A3").set_value_number(1002);
            sheet.get_cell_mut("B3").set_value("Ben");
        }

        let table = read_table(&book, "IT").unwrap();
        assert_eq!(table.headers, vec!["工號", "姓名"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, 0), &CellValue::text("1002"));

        let err = read_table(&book, "Talk").unwrap_err();
        assert!(matches!(err, Error::SheetNotFound { available, .. } if available == "IT"));
    }
}
