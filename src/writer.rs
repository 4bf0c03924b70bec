use crate::error::{Error, Result};
use crate::formula::column_letter;
use crate::table::{CellValue, Table};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use umya_spreadsheet::structs::Worksheet;
use umya_spreadsheet::Spreadsheet;

/// Destination for finished report tables.
pub trait SheetSink {
    /// Store `table` under `table.name`, replacing any sheet of that name.
    fn write_table(&mut self, table: &Table) -> Result<()>;

    /// Merge runs of identical non-empty cells within each row of a sheet.
    fn merge_repeated_cells(&mut self, sheet: &str) -> Result<()>;
}

/// Writes each table straight into an `.xlsx` file, one open/save per call.
pub struct XlsxSink {
    path: PathBuf,
}

impl XlsxSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<Spreadsheet> {
        check_lock_file(&self.path)?;
        if self.path.exists() {
            umya_spreadsheet::reader::xlsx::read(&self.path).map_err(|e| Error::InvalidExcel {
                path: self.path.clone(),
                details: e.to_string(),
            })
        } else {
            debug!("creating {}", self.path.display());
            Ok(umya_spreadsheet::new_file_empty_worksheet())
        }
    }

    fn save(&self, book: &Spreadsheet) -> Result<()> {
        umya_spreadsheet::writer::xlsx::write(book, &self.path).map_err(|e| {
            Error::WriteConflict {
                path: self.path.clone(),
                details: e.to_string(),
            }
        })
    }
}

impl SheetSink for XlsxSink {
    fn write_table(&mut self, table: &Table) -> Result<()> {
        let mut book = self.load()?;

        if book.get_sheet_by_name(&table.name).is_some() {
            debug!("replacing sheet {}", table.name);
            book.remove_sheet_by_name(&table.name)
                .map_err(|e| self.conflict(e))?;
        }
        let sheet = book.new_sheet(&table.name).map_err(|e| self.conflict(e))?;
        fill_sheet(sheet, table);

        self.save(&book)?;
        info!(
            "wrote sheet {} ({} rows, {} columns)",
            table.name,
            table.len(),
            table.width()
        );
        Ok(())
    }

    fn merge_repeated_cells(&mut self, name: &str) -> Result<()> {
        let mut book = self.load()?;
        let available = book
            .get_sheet_collection()
            .iter()
            .map(|s| s.get_name().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let sheet = book
            .get_sheet_by_name_mut(name)
            .ok_or_else(|| Error::SheetNotFound {
                name: name.to_string(),
                available,
            })?;

        let merged = merge_sheet(sheet);
        self.save(&book)?;
        info!("merged {} cell runs in {}", merged, name);
        Ok(())
    }
}

impl XlsxSink {
    fn conflict(&self, details: &str) -> Error {
        Error::WriteConflict {
            path: self.path.clone(),
            details: details.to_string(),
        }
    }
}

/// A spreadsheet application holding the file open leaves `~$<name>` beside it.
fn check_lock_file(path: &Path) -> Result<()> {
    let Some(name) = path.file_name() else {
        return Ok(());
    };
    let lock = path.with_file_name(format!("~${}", name.to_string_lossy()));
    if lock.exists() {
        return Err(Error::WriteConflict {
            path: path.to_path_buf(),
            details: format!("file is open elsewhere ({} exists)", lock.display()),
        });
    }
    Ok(())
}

fn fill_sheet(sheet: &mut Worksheet, table: &Table) {
    for (col, header) in table.headers.iter().enumerate() {
        sheet
            .get_cell_mut((col as u32 + 1, 1))
            .set_value_string(header.as_str());
    }

    for (idx, record) in table.rows.iter().enumerate() {
        let row = idx as u32 + 2;
        for (col, value) in record.iter().enumerate() {
            let col = col as u32 + 1;
            match value {
                CellValue::Empty => {}
                CellValue::Text(text) => {
                    sheet.get_cell_mut((col, row)).set_value_string(text.as_str());
                }
                CellValue::Number(n) => {
                    sheet.get_cell_mut((col, row)).set_value_number(*n);
                }
                CellValue::Formula(formula) => {
                    sheet.get_cell_mut((col, row)).set_formula(formula.body());
                }
            }
        }
    }
}

/// Column spans `(first, last)`, 1-based and inclusive, of runs of two or more
/// equal non-empty values.
pub fn merge_runs(values: &[String]) -> Vec<(u32, u32)> {
    let mut runs = Vec::new();
    let mut start = 0;

    while start < values.len() {
        let mut end = start;
        while end + 1 < values.len() && values[end + 1] == values[start] {
            end += 1;
        }
        if end > start && !values[start].trim().is_empty() {
            runs.push((start as u32 + 1, end as u32 + 1));
        }
        start = end + 1;
    }

    runs
}

fn merge_sheet(sheet: &mut Worksheet) -> usize {
    let (max_col, max_row) = sheet.get_highest_column_and_row();
    let mut merged = 0;

    for row in 1..=max_row {
        let values: Vec<String> = (1..=max_col)
            .map(|col| {
                sheet
                    .get_cell((col, row))
                    .map(|c| c.get_value().to_string())
                    .unwrap_or_default()
            })
            .collect();

        for (first, last) in merge_runs(&values) {
            sheet.add_merge_cells(format!(
                "{}{}:{}{}",
                column_letter(first),
                row,
                column_letter(last),
                row
            ));
            merged += 1;
        }
    }

    merged
}

/// Keeps written tables in memory.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySink {
    pub tables: Vec<Table>,
    pub merged: Vec<String>,
}

#[cfg(test)]
impl MemorySink {
    pub fn table(&self, name: &str) -> &Table {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .unwrap_or_else(|| panic!("no table {}", name))
    }
}

#[cfg(test)]
impl SheetSink for MemorySink {
    fn write_table(&mut self, table: &Table) -> Result<()> {
        self.tables.retain(|t| t.name != table.name);
        self.tables.push(table.clone());
        Ok(())
    }

    fn merge_repeated_cells(&mut self, sheet: &str) -> Result<()> {
        if !self.tables.iter().any(|t| t.name == sheet) {
            return Err(Error::SheetNotFound {
                name: sheet.to_string(),
                available: String::new(),
            });
        }
        self.merged.push(sheet.to_string());
        Ok(())
    }
}
