//! Typed A1 references and the handful of spreadsheet functions the report uses.
//!
//! All row/column arithmetic happens on [`CellRef`] values; text only appears
//! when a reference or [`Formula`] is rendered.

use std::fmt;

/// Convert a 1-based column number to letters (1 = A, 27 = AA).
pub fn column_letter(index: u32) -> String {
    let mut letters = String::new();
    let mut n = index;

    while n > 0 {
        let remainder = (n - 1) % 26;
        letters.insert(0, (b'A' + remainder as u8) as char);
        n = (n - 1) / 26;
    }

    letters
}

/// Convert column letters to a 1-based number (A = 1, AA = 27).
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        Some(acc * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub col: u32,
    pub row: u32,
    pub abs_col: bool,
    pub abs_row: bool,
}

impl CellRef {
    pub fn new(col: u32, row: u32) -> Self {
        Self {
            col,
            row,
            abs_col: false,
            abs_row: false,
        }
    }

    /// `$A$1`
    pub fn absolute(mut self) -> Self {
        self.abs_col = true;
        self.abs_row = true;
        self
    }

    /// `$A1`
    pub fn fixed_col(mut self) -> Self {
        self.abs_col = true;
        self
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let col_mark = if self.abs_col { "$" } else { "" };
        let row_mark = if self.abs_row { "$" } else { "" };
        write!(
            f,
            "{}{}{}{}",
            col_mark,
            column_letter(self.col),
            row_mark,
            self.row
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRef {
    pub sheet: Option<String>,
    pub start: CellRef,
    pub end: CellRef,
}

impl RangeRef {
    pub fn new(start: CellRef, end: CellRef) -> Self {
        Self {
            sheet: None,
            start,
            end,
        }
    }

    /// Absolute single-column range, e.g. `$F$3:$F$70`.
    pub fn column(col: u32, first_row: u32, last_row: u32) -> Self {
        Self::new(
            CellRef::new(col, first_row).absolute(),
            CellRef::new(col, last_row).absolute(),
        )
    }

    /// Relative single-row range, e.g. `G5:Q5`.
    pub fn row(row: u32, first_col: u32, last_col: u32) -> Self {
        Self::new(CellRef::new(first_col, row), CellRef::new(last_col, row))
    }

    pub fn on_sheet(mut self, sheet: &str) -> Self {
        self.sheet = Some(sheet.to_string());
        self
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            write!(f, "'{}'!", sheet.replace('\'', "''"))?;
        }
        write!(f, "{}:{}", self.start, self.end)
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// A formula body without the leading `=`. `Display` adds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula(String);

impl Formula {
    pub fn countif(range: &RangeRef, criterion: &str) -> Self {
        Formula(format!("COUNTIF({},{})", range, quote(criterion)))
    }

    pub fn countifs(conditions: &[(&RangeRef, &str)]) -> Self {
        let args = conditions
            .iter()
            .map(|(range, criterion)| format!("{},{}", range, quote(criterion)))
            .collect::<Vec<_>>()
            .join(",");
        Formula(format!("COUNTIFS({})", args))
    }

    pub fn counta(range: &RangeRef) -> Self {
        Formula(format!("COUNTA({})", range))
    }

    pub fn sum(range: &RangeRef) -> Self {
        Formula(format!("SUM({})", range))
    }

    /// `B2+D2+F2`
    pub fn sum_of(cells: &[CellRef]) -> Self {
        Formula(
            cells
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join("+"),
        )
    }

    /// `IF((a+b)=c,"OK", "error")`
    pub fn if_sum_equals(addends: &[CellRef], total: CellRef, ok: &str, error: &str) -> Self {
        let lhs = Formula::sum_of(addends);
        Formula(format!(
            "IF(({})={},{}, {})",
            lhs.body(),
            total,
            quote(ok),
            quote(error)
        ))
    }

    /// `IF(H2>0, "OK", "need to arrange")`
    pub fn if_positive(cell: CellRef, yes: &str, no: &str) -> Self {
        Formula(format!("IF({}>0, {}, {})", cell, quote(yes), quote(no)))
    }

    pub fn plus(self, other: Formula) -> Self {
        Formula(format!("{} + {}", self.0, other.0))
    }

    pub fn body(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "={}", self.0)
    }
}

/// `ROUND(([@num]/[@den])*100,2) & "%"` over table column names.
///
/// Structured references only resolve once the sheet range is formatted as a
/// table, so this is kept as expression text rather than a [`Formula`].
pub fn structured_percentage(numerator: &str, denominator: &str) -> String {
    format!(
        "ROUND(([@{}]/[@{}])*100,2) & \"%\"",
        numerator, denominator
    )
}
