use crate::formula::Formula;

/// Value of one cell in an in-memory sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Formula(Formula),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<Formula> for CellValue {
    fn from(formula: Formula) -> Self {
        CellValue::Formula(formula)
    }
}

/// A sheet: header on row 1, data rows below it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 0-based position of a header.
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == header)
    }

    /// Headers from `wanted` that this table does not have.
    pub fn missing_columns(&self, wanted: &[&str]) -> Vec<String> {
        wanted
            .iter()
            .filter(|h| self.column(h).is_none())
            .map(|h| h.to_string())
            .collect()
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&CellValue::Empty)
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_lookup() {
        let mut table = Table::new("IT", vec!["工號".into(), " 姓名 ".into()]);
        table.push_row(vec![CellValue::text("A001")]);

        assert_eq!(table.column("姓名"), Some(1));
        assert_eq!(table.missing_columns(&["工號", "上級主管"]), vec!["上級主管"]);
        assert_eq!(table.cell(0, 0), &CellValue::text("A001"));
        assert_eq!(table.cell(0, 1), &CellValue::Empty);
        assert_eq!(table.cell(4, 0), &CellValue::Empty);
    }

    #[test]
    fn test_blank_text_is_empty() {
        assert!(CellValue::text("  ").is_empty());
        assert!(!CellValue::Number(0.0).is_empty());
    }
}
