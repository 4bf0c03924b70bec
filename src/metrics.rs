//! Daily attendance formulas for the `_Func` statistics sheet.
//!
//! Count cells read the grid sheet directly; the filled, percentage and check
//! cells only read other cells on the same statistics row. Every column letter
//! used below comes from [`StatColumn`].

use crate::formula::{structured_percentage, CellRef, Formula, RangeRef};
use crate::table::CellValue;
use serde::Deserialize;

/// Cell values employees type into the attendance grid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Markers {
    pub work_from_home: String,
    pub in_office: String,
    pub business_travel: String,
    /// COUNTIF wildcard pattern matching every leave type.
    pub leave: String,
    /// Mark for a completed one-on-one talk.
    pub talked: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            work_from_home: "居家工作".to_string(),
            in_office: "進公司".to_string(),
            business_travel: "出差".to_string(),
            leave: "*假".to_string(),
            talked: "v".to_string(),
        }
    }
}

/// Columns of the statistics sheet, in sheet order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatColumn {
    Date,
    WorkFromHome,
    WorkFromHomePct,
    InOffice,
    InOfficePct,
    Leave,
    LeavePct,
    Empty,
    EmptyPct,
    Filled,
    FilledPct,
    Headcount,
    Check,
}

impl StatColumn {
    pub const ALL: [StatColumn; 13] = [
        StatColumn::Date,
        StatColumn::WorkFromHome,
        StatColumn::WorkFromHomePct,
        StatColumn::InOffice,
        StatColumn::InOfficePct,
        StatColumn::Leave,
        StatColumn::LeavePct,
        StatColumn::Empty,
        StatColumn::EmptyPct,
        StatColumn::Filled,
        StatColumn::FilledPct,
        StatColumn::Headcount,
        StatColumn::Check,
    ];

    /// 1-based sheet column.
    pub fn index(self) -> u32 {
        self as u32 + 1
    }

    pub fn header(self) -> &'static str {
        match self {
            StatColumn::Date => "Date",
            StatColumn::WorkFromHome => "居家工作",
            StatColumn::WorkFromHomePct => "居家工作%",
            StatColumn::InOffice => "進公司",
            StatColumn::InOfficePct => "進公司%",
            StatColumn::Leave => "請假",
            StatColumn::LeavePct => "請假%",
            StatColumn::Empty => "未填",
            StatColumn::EmptyPct => "未填%",
            StatColumn::Filled => "已填",
            StatColumn::FilledPct => "已填%",
            StatColumn::Headcount => "IT總人數",
            StatColumn::Check => "Check",
        }
    }

    pub fn headers() -> Vec<String> {
        StatColumn::ALL.iter().map(|c| c.header().to_string()).collect()
    }

    fn at(self, row: u32) -> CellRef {
        CellRef::new(self.index(), row)
    }
}

/// Header sits on row 1; data row `i` (0-based) lands on sheet row `i + 2`.
pub const STAT_FIRST_DATA_ROW: u32 = 2;

pub fn stat_sheet_row(row_index: usize) -> u32 {
    row_index as u32 + STAT_FIRST_DATA_ROW
}

/// Placeholder written into category cells of non-working days.
pub const PLACEHOLDER: &str = "-";

/// Number of attendance category cells (five counts, five percentages).
pub const CATEGORY_CELLS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct FormulaSet {
    pub count_wfh: Formula,
    pub pct_wfh: String,
    pub count_office: Formula,
    pub pct_office: String,
    pub count_leave: Formula,
    pub pct_leave: String,
    pub count_empty: Formula,
    pub pct_empty: String,
    pub count_filled: Formula,
    pub pct_filled: String,
    pub total_headcount: Formula,
    pub check: Formula,
}

impl FormulaSet {
    /// Cells for columns `居家工作` through `Check`.
    pub fn into_cells(self) -> Vec<CellValue> {
        vec![
            self.count_wfh.into(),
            CellValue::Text(self.pct_wfh),
            self.count_office.into(),
            CellValue::Text(self.pct_office),
            self.count_leave.into(),
            CellValue::Text(self.pct_leave),
            self.count_empty.into(),
            CellValue::Text(self.pct_empty),
            self.count_filled.into(),
            CellValue::Text(self.pct_filled),
            self.total_headcount.into(),
            self.check.into(),
        ]
    }
}

pub struct FormulaGenerator<'a> {
    markers: &'a Markers,
    headcount_range: RangeRef,
}

impl<'a> FormulaGenerator<'a> {
    /// `headcount_range` is the roster ID column on the grid sheet.
    pub fn new(markers: &'a Markers, headcount_range: RangeRef) -> Self {
        Self {
            markers,
            headcount_range,
        }
    }

    pub fn total_headcount(&self) -> Formula {
        Formula::counta(&self.headcount_range)
    }

    /// Formulas for one working day. `cell_range` is that day's column on the
    /// grid sheet and `row_index` the 0-based data row in the statistics sheet.
    pub fn generate_daily_formulas(&self, cell_range: &RangeRef, row_index: usize) -> FormulaSet {
        let row = stat_sheet_row(row_index);
        let m = self.markers;
        let pct = |col: StatColumn| structured_percentage(col.header(), StatColumn::Headcount.header());

        FormulaSet {
            count_wfh: Formula::countif(cell_range, &m.work_from_home),
            pct_wfh: pct(StatColumn::WorkFromHome),
            count_office: Formula::countif(cell_range, &m.in_office)
                .plus(Formula::countif(cell_range, &m.business_travel)),
            pct_office: pct(StatColumn::InOffice),
            count_leave: Formula::countif(cell_range, &m.leave),
            pct_leave: pct(StatColumn::Leave),
            count_empty: Formula::countif(cell_range, ""),
            pct_empty: pct(StatColumn::Empty),
            count_filled: Formula::sum_of(&[
                StatColumn::WorkFromHome.at(row),
                StatColumn::InOffice.at(row),
                StatColumn::Leave.at(row),
            ]),
            pct_filled: pct(StatColumn::Filled),
            total_headcount: self.total_headcount(),
            check: Formula::if_sum_equals(
                &[
                    StatColumn::Empty.at(row).fixed_col(),
                    StatColumn::Filled.at(row).fixed_col(),
                ],
                StatColumn::Headcount.at(row).fixed_col(),
                "OK",
                "error",
            ),
        }
    }

    /// Cells for a calendar day that is not a working day.
    pub fn placeholder_cells(&self) -> Vec<CellValue> {
        let mut cells = vec![CellValue::text(PLACEHOLDER); CATEGORY_CELLS];
        cells.push(self.total_headcount().into());
        cells
    }
}
