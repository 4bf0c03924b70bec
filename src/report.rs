//! Builds the monthly report sheets and hands them to a [`SheetSink`].
//!
//! Sheets are written in dependency order: the statistics sheet reads the
//! attendance grid, the supervisor analysis reads the talk summary.

use crate::calendar::{self, format_date, WorkingDay};
use crate::config::ReportConfig;
use crate::error::{Error, Result};
use crate::formula::{CellRef, Formula, RangeRef};
use crate::metrics::{FormulaGenerator, StatColumn};
use crate::reader;
use crate::table::{CellValue, Table};
use crate::writer::SheetSink;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

pub const TALK_SUMMARY_SHEET: &str = "one-on-one_Talk_月結";
pub const SUPERVISOR_SHEET: &str = "one-on-one_Talk_月分析";

/// Grid sheet: header on row 1, dates on row 2, employees from row 3.
const GRID_FIRST_EMPLOYEE_ROW: u32 = 3;
/// Talk grid and summary: header on row 1, records from row 2.
const FIRST_RECORD_ROW: u32 = 2;

const TALK_ID: &str = "工號";
const TALK_NAME: &str = "姓名";
const TALK_SUPERVISOR: &str = "上級主管";
const TALK_COLUMNS: [&str; 6] = [TALK_ID, TALK_NAME, "事業處名", "處級名", "部級名", TALK_SUPERVISOR];

const SUMMARY_HEADERS: [&str; 9] = [
    "YearMonth",
    "員工工號",
    "員工姓名",
    "事業處名",
    "處級名",
    "部級名",
    TALK_SUPERVISOR,
    "one-on-one activity_monthly count",
    "Achieve goals",
];
const SUMMARY_SUPERVISOR_COL: u32 = 7;
const SUMMARY_ACTIVITY_COL: u32 = 8;
const SUMMARY_GOAL_COL: u32 = 9;
const GOAL_MET: &str = "OK";
const GOAL_MISSED: &str = "need to arrange";

const ANALYSIS_HEADERS: [&str; 4] = ["YearMonth", TALK_SUPERVISOR, "Talked", "member count"];
const ANALYSIS_TALKED_COL: u32 = 3;
const ANALYSIS_MEMBER_COL: u32 = 4;

/// What a run produced, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub sheets: Vec<String>,
    pub working_days: usize,
    pub roster_rows: usize,
    pub talk_rows: usize,
}

pub struct MonthlyReport<'a> {
    config: &'a ReportConfig,
    roster: &'a Table,
    talk_roster: &'a Table,
    id_col: usize,
    working_days: Vec<WorkingDay>,
    all_days: Vec<NaiveDate>,
}

impl<'a> MonthlyReport<'a> {
    pub fn new(config: &'a ReportConfig, roster: &'a Table, talk_roster: &'a Table) -> Result<Self> {
        let id_col = roster.column(&config.id_header).ok_or_else(|| Error::SchemaMismatch {
            sheet: roster.name.clone(),
            missing: vec![config.id_header.clone()],
        })?;

        let missing = talk_roster.missing_columns(&TALK_COLUMNS);
        if !missing.is_empty() {
            return Err(Error::SchemaMismatch {
                sheet: talk_roster.name.clone(),
                missing,
            });
        }

        if roster.is_empty() {
            warn!("roster sheet {} has no employee rows", roster.name);
        }

        let working_days = calendar::working_days(config.month, &config.holidays, config.week_start);
        let all_days = calendar::all_days(config.month);
        debug!(
            "{}: {} working days of {}",
            config.month.sheet_stamp(),
            working_days.len(),
            all_days.len()
        );

        Ok(Self {
            config,
            roster,
            talk_roster,
            id_col,
            working_days,
            all_days,
        })
    }

    pub fn grid_sheet_name(&self) -> String {
        self.config.month.sheet_stamp()
    }

    pub fn stats_sheet_name(&self) -> String {
        format!("{}_Func", self.config.month.sheet_stamp())
    }

    pub fn talk_sheet_name(&self) -> String {
        format!("one-on-one_TalkStatistic_{}", self.config.month.talk_stamp())
    }

    fn last_employee_row(&self) -> u32 {
        GRID_FIRST_EMPLOYEE_ROW + self.roster.len() as u32 - 1
    }

    /// Grid column of the `index`-th working day.
    fn grid_date_col(&self, index: usize) -> u32 {
        (self.roster.width() + 1 + index) as u32
    }

    /// Roster × working-day matrix for employees to fill in.
    pub fn attendance_grid(&self) -> Table {
        let mut headers = self.roster.headers.clone();
        headers.extend(self.working_days.iter().map(WorkingDay::week_text));
        let width = headers.len();
        let mut table = Table::new(self.grid_sheet_name(), headers);

        let mut date_row = vec![CellValue::Empty; self.roster.width()];
        date_row.extend(
            self.working_days
                .iter()
                .map(|wd| CellValue::text(format_date(wd.date))),
        );
        table.push_row(date_row);

        for record in &self.roster.rows {
            let mut row = record.clone();
            row.resize(width, CellValue::Empty);
            table.push_row(row);
        }

        table
    }

    /// One row per calendar day with formulas over the grid sheet.
    pub fn daily_stats(&self) -> Table {
        let grid = self.grid_sheet_name();
        let headcount = RangeRef::column(
            self.id_col as u32 + 1,
            GRID_FIRST_EMPLOYEE_ROW,
            self.last_employee_row(),
        )
        .on_sheet(&grid);
        let generator = FormulaGenerator::new(&self.config.markers, headcount);

        let mut table = Table::new(self.stats_sheet_name(), StatColumn::headers());
        for (idx, day) in self.all_days.iter().enumerate() {
            let mut row = vec![CellValue::text(format_date(*day))];
            match self.working_days.iter().position(|wd| wd.date == *day) {
                Some(wd_index) => {
                    let col = self.grid_date_col(wd_index);
                    let range = RangeRef::column(col, GRID_FIRST_EMPLOYEE_ROW, self.last_employee_row())
                        .on_sheet(&grid);
                    row.extend(generator.generate_daily_formulas(&range, idx).into_cells());
                }
                None => row.extend(generator.placeholder_cells()),
            }
            table.push_row(row);
        }

        table
    }

    /// Talk roster with one blank column per working day, headed by its date.
    pub fn talk_grid(&self) -> Table {
        let mut headers = self.talk_roster.headers.clone();
        headers.extend(self.working_days.iter().map(|wd| format_date(wd.date)));
        let width = headers.len();
        let mut table = Table::new(self.talk_sheet_name(), headers);

        for record in &self.talk_roster.rows {
            let mut row = record.clone();
            row.resize(width, CellValue::Empty);
            table.push_row(row);
        }

        table
    }

    /// Employees with a supervisor, with their monthly talk count and goal status.
    pub fn talk_summary(&self) -> Table {
        let talk = self.talk_roster;
        let source_cols: Vec<usize> = TALK_COLUMNS
            .iter()
            .filter_map(|h| talk.column(h))
            .collect();
        let supervisor_col = talk.column(TALK_SUPERVISOR).unwrap_or(talk.width());
        let first_date_col = talk.width() as u32 + 1;
        let last_date_col = talk.width() as u32 + self.working_days.len() as u32;
        let talk_sheet = self.talk_sheet_name();
        let label = self.config.month.label();

        let headers = SUMMARY_HEADERS.iter().map(|h| h.to_string()).collect();
        let mut table = Table::new(TALK_SUMMARY_SHEET, headers);

        for source_idx in (0..talk.len()).filter(|i| !talk.cell(*i, supervisor_col).is_empty()) {
            let talk_row = source_idx as u32 + FIRST_RECORD_ROW;
            let summary_row = table.len() as u32 + FIRST_RECORD_ROW;
            let days = RangeRef::row(talk_row, first_date_col, last_date_col).on_sheet(&talk_sheet);

            let mut row = vec![CellValue::text(label.clone())];
            row.extend(source_cols.iter().map(|c| talk.cell(source_idx, *c).clone()));
            row.push(Formula::countifs(&[(&days, self.config.markers.talked.as_str())]).into());
            row.push(
                Formula::if_positive(
                    CellRef::new(SUMMARY_ACTIVITY_COL, summary_row),
                    GOAL_MET,
                    GOAL_MISSED,
                )
                .into(),
            );
            table.push_row(row);
        }

        table
    }

    /// Per-supervisor talked/member counts for this month and cumulatively
    /// with the prior month's rows appended below this month's in the summary.
    pub fn supervisor_analysis(&self, summary_rows: usize) -> Table {
        let supervisors = &self.config.supervisors;
        let current_last = FIRST_RECORD_ROW + summary_rows as u32 - 1;
        let cumulative_last = current_last + self.config.last_month_count;
        let label = self.config.month.label();

        let headers = ANALYSIS_HEADERS.iter().map(|h| h.to_string()).collect();
        let mut table = Table::new(SUPERVISOR_SHEET, headers);

        for supervisor in supervisors {
            let (talked, members) = supervisor_counts(supervisor, current_last);
            table.push_row(vec![
                CellValue::text(label.clone()),
                CellValue::text(supervisor.clone()),
                talked.into(),
                members.into(),
            ]);
        }

        // With no supervisor rows a SUM range would cover the totals cell itself.
        let last_supervisor_row = FIRST_RECORD_ROW + supervisors.len() as u32 - 1;
        let total = |col: u32| -> CellValue {
            if supervisors.is_empty() {
                return CellValue::Number(0.0);
            }
            Formula::sum(&RangeRef::new(
                CellRef::new(col, FIRST_RECORD_ROW),
                CellRef::new(col, last_supervisor_row),
            ))
            .into()
        };
        table.push_row(vec![
            CellValue::Empty,
            CellValue::Empty,
            total(ANALYSIS_TALKED_COL),
            total(ANALYSIS_MEMBER_COL),
        ]);
        table.push_row(Vec::new());

        for supervisor in supervisors {
            let (talked, members) = supervisor_counts(supervisor, cumulative_last);
            table.push_row(vec![
                CellValue::Empty,
                CellValue::text(supervisor.clone()),
                talked.into(),
                members.into(),
            ]);
        }

        table
    }

    /// Build every sheet and write them in dependency order.
    pub fn write_all<S: SheetSink>(&self, sink: &mut S) -> Result<ReportSummary> {
        let mut sheets = Vec::new();

        let grid = self.attendance_grid();
        sink.write_table(&grid)?;
        sheets.push(grid.name.clone());

        let stats = self.daily_stats();
        sink.write_table(&stats)?;
        sheets.push(stats.name.clone());

        sink.merge_repeated_cells(&grid.name)?;

        let talk = self.talk_grid();
        sink.write_table(&talk)?;
        sheets.push(talk.name.clone());

        let summary = self.talk_summary();
        if summary.is_empty() {
            warn!("no talk records with a supervisor in {}", self.talk_roster.name);
        }
        sink.write_table(&summary)?;
        sheets.push(summary.name.clone());

        if self.config.supervisors.is_empty() {
            warn!("no supervisors configured; analysis has only a totals row");
        }
        let analysis = self.supervisor_analysis(summary.len());
        sink.write_table(&analysis)?;
        sheets.push(analysis.name.clone());

        Ok(ReportSummary {
            sheets,
            working_days: self.working_days.len(),
            roster_rows: self.roster.len(),
            talk_rows: summary.len(),
        })
    }
}

/// Talked and member COUNTIFS over summary rows `2..=last_row`.
fn supervisor_counts(supervisor: &str, last_row: u32) -> (Formula, Formula) {
    let supervisors = RangeRef::column(SUMMARY_SUPERVISOR_COL, FIRST_RECORD_ROW, last_row)
        .on_sheet(TALK_SUMMARY_SHEET);
    let goals =
        RangeRef::column(SUMMARY_GOAL_COL, FIRST_RECORD_ROW, last_row).on_sheet(TALK_SUMMARY_SHEET);

    let talked = Formula::countifs(&[(&supervisors, supervisor), (&goals, GOAL_MET)]);
    let members = Formula::countifs(&[(&supervisors, supervisor)]);
    (talked, members)
}

/// Read the roster and talk sheets named by `config`.
pub fn load_inputs(config: &ReportConfig) -> Result<(Table, Table)> {
    info!("reading roster {}", config.roster.display());
    let book = reader::open_workbook(&config.roster)?;

    let roster = match &config.roster_sheet {
        Some(name) => reader::read_table(&book, name)?,
        None => reader::read_first_table(&book)?,
    };
    let talk = reader::read_table(&book, &config.talk_sheet)?;
    debug!(
        "roster {}: {} rows, talk {}: {} rows",
        roster.name,
        roster.len(),
        talk.name,
        talk.len()
    );

    Ok((roster, talk))
}

pub fn generate<S: SheetSink>(config: &ReportConfig, sink: &mut S) -> Result<ReportSummary> {
    let (roster, talk) = load_inputs(config)?;
    MonthlyReport::new(config, &roster, &talk)?.write_all(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileConfig, Overrides, ReportConfig};
    use crate::writer::{MemorySink, XlsxSink};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn texts(items: &[&str]) -> Vec<CellValue> {
        items
            .iter()
            .map(|s| {
                if s.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::text(*s)
                }
            })
            .collect()
    }

    fn config(supervisors: &[&str]) -> ReportConfig {
        let file = FileConfig {
            year: Some(2022),
            month: Some(12),
            holidays: strings(&["2022/12/26"]),
            supervisors: strings(supervisors),
            last_month_count: 5,
            ..Default::default()
        };
        ReportConfig::resolve(file, Overrides::default()).unwrap()
    }

    fn roster() -> Table {
        let mut table = Table::new("IT", strings(&["事業處名", "處級名", "部級名", "姓名", "工號"]));
        table.push_row(texts(&["資訊處", "開發處", "一部", "Amy", "A001"]));
        table.push_row(texts(&["資訊處", "開發處", "二部", "Ben", "A002"]));
        table.push_row(texts(&["資訊處", "維運處", "三部", "Cid", "A003"]));
        table
    }

    fn talk_roster() -> Table {
        let mut table = Table::new(
            "one_on_one_talk_statistic",
            strings(&["工號", "姓名", "事業處名", "處級名", "部級名", "上級主管"]),
        );
        table.push_row(texts(&["A001", "Amy", "資訊處", "開發處", "一部", "Alice"]));
        table.push_row(texts(&["A002", "Ben", "資訊處", "開發處", "二部", ""]));
        table.push_row(texts(&["A003", "Cid", "資訊處", "維運處", "三部", "Bob"]));
        table
    }

    fn formula(cell: &CellValue) -> String {
        match cell {
            CellValue::Formula(f) => f.to_string(),
            other => panic!("not a formula: {:?}", other),
        }
    }

    #[test]
    fn test_attendance_grid() {
        let (config, roster, talk) = (config(&[]), roster(), talk_roster());
        let report = MonthlyReport::new(&config, &roster, &talk).unwrap();
        let grid = report.attendance_grid();

        assert_eq!(grid.name, "2022_12");
        assert_eq!(grid.width(), 5 + 21);
        assert_eq!(&grid.headers[5..7], &["Week1", "Week1"]);
        assert_eq!(grid.headers.last().unwrap(), "Week5");
        assert_eq!(grid.len(), 4);
        assert_eq!(grid.cell(0, 0), &CellValue::Empty);
        assert_eq!(grid.cell(0, 5), &CellValue::text("2022/12/1"));
        assert_eq!(grid.cell(1, 4), &CellValue::text("A001"));
        assert!(grid.rows.iter().all(|r| r.len() == grid.width()));
    }

    #[test]
    fn test_daily_stats_layout() {
        let (config, roster, talk) = (config(&[]), roster(), talk_roster());
        let report = MonthlyReport::new(&config, &roster, &talk).unwrap();
        let stats = report.daily_stats();

        assert_eq!(stats.name, "2022_12_Func");
        assert_eq!(stats.len(), 31);

        // Thu 1st: first working day, grid column F.
        let first = &stats.rows[0];
        assert_eq!(first.len(), 13);
        assert_eq!(first[0], CellValue::text("2022/12/1"));
        assert_eq!(formula(&first[1]), "=COUNTIF('2022_12'!$F$3:$F$5,\"居家工作\")");
        assert_eq!(formula(&first[11]), "=COUNTA('2022_12'!$E$3:$E$5)");
        assert_eq!(formula(&first[12]), "=IF(($H2+$J2)=$L2,\"OK\", \"error\")");

        // Sat 3rd: placeholders and headcount only.
        let weekend = &stats.rows[2];
        assert_eq!(weekend.len(), 12);
        assert_eq!(weekend[1], CellValue::text("-"));
        assert_eq!(formula(&weekend[11]), "=COUNTA('2022_12'!$E$3:$E$5)");

        // Mon 5th is the third working day: column H.
        assert_eq!(formula(&stats.rows[4][5]), "=COUNTIF('2022_12'!$H$3:$H$5,\"*假\")");

        // Mon 26th is a holiday.
        assert_eq!(stats.rows[25].len(), 12);

        // Tue 27th is working day #18 (index 17): column W, sheet row 28.
        let row = &stats.rows[26];
        assert_eq!(formula(&row[7]), "=COUNTIF('2022_12'!$W$3:$W$5,\"\")");
        assert_eq!(formula(&row[9]), "=B28+D28+F28");
        assert_eq!(formula(&row[12]), "=IF(($H28+$J28)=$L28,\"OK\", \"error\")");
    }

    #[test]
    fn test_talk_grid_and_summary() {
        let (config, roster, talk) = (config(&["Alice", "Bob"]), roster(), talk_roster());
        let report = MonthlyReport::new(&config, &roster, &talk).unwrap();

        let grid = report.talk_grid();
        assert_eq!(grid.name, "one-on-one_TalkStatistic_122022");
        assert_eq!(grid.width(), 6 + 21);
        assert_eq!(grid.headers[6], "2022/12/1");
        assert_eq!(grid.len(), 3);

        let summary = report.talk_summary();
        assert_eq!(summary.name, TALK_SUMMARY_SHEET);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary.rows[0][0], CellValue::text("Dec 2022"));
        assert_eq!(summary.rows[0][1], CellValue::text("A001"));
        assert_eq!(summary.rows[1][6], CellValue::text("Bob"));

        // Cid is the third talk row, so sheet row 4; dates run G..AA.
        assert_eq!(
            formula(&summary.rows[1][7]),
            "=COUNTIFS('one-on-one_TalkStatistic_122022'!G4:AA4,\"v\")"
        );
        assert_eq!(
            formula(&summary.rows[1][8]),
            "=IF(H3>0, \"OK\", \"need to arrange\")"
        );
    }

    #[test]
    fn test_supervisor_analysis() {
        let (config, roster, talk) = (config(&["Alice", "Bob"]), roster(), talk_roster());
        let report = MonthlyReport::new(&config, &roster, &talk).unwrap();
        let analysis = report.supervisor_analysis(2);

        assert_eq!(analysis.headers, strings(&ANALYSIS_HEADERS));
        assert_eq!(analysis.len(), 2 + 1 + 1 + 2);
        assert_eq!(
            formula(&analysis.rows[0][2]),
            "=COUNTIFS('one-on-one_Talk_月結'!$G$2:$G$3,\"Alice\",'one-on-one_Talk_月結'!$I$2:$I$3,\"OK\")"
        );
        assert_eq!(
            formula(&analysis.rows[1][3]),
            "=COUNTIFS('one-on-one_Talk_月結'!$G$2:$G$3,\"Bob\")"
        );
        assert_eq!(formula(&analysis.rows[2][2]), "=SUM(C2:C3)");
        assert_eq!(formula(&analysis.rows[2][3]), "=SUM(D2:D3)");
        assert!(analysis.rows[3].is_empty());
        assert_eq!(analysis.rows[4][0], CellValue::Empty);
        assert_eq!(
            formula(&analysis.rows[4][2]),
            "=COUNTIFS('one-on-one_Talk_月結'!$G$2:$G$8,\"Alice\",'one-on-one_Talk_月結'!$I$2:$I$8,\"OK\")"
        );
    }

    #[test]
    fn test_totals_span_supervisor_rows() {
        let names = ["A", "B", "C", "D", "E", "F", "G", "H"];
        let (config, roster, talk) = (config(&names), roster(), talk_roster());
        let report = MonthlyReport::new(&config, &roster, &talk).unwrap();
        let analysis = report.supervisor_analysis(2);

        let totals = &analysis.rows[names.len()];
        assert_eq!(formula(&totals[2]), "=SUM(C2:C9)");
        assert_eq!(formula(&totals[3]), "=SUM(D2:D9)");
    }

    #[test]
    fn test_no_supervisors_totals_are_zero() {
        let (config, roster, talk) = (config(&[]), roster(), talk_roster());
        let report = MonthlyReport::new(&config, &roster, &talk).unwrap();
        let analysis = report.supervisor_analysis(0);

        assert_eq!(analysis.len(), 2);
        assert_eq!(
            analysis.rows[0],
            vec![
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Number(0.0),
                CellValue::Number(0.0),
            ]
        );
        assert!(analysis
            .rows
            .iter()
            .flatten()
            .all(|c| !matches!(c, CellValue::Formula(_))));
    }

    #[test]
    fn test_schema_mismatch() {
        let config = config(&[]);
        let roster = roster();
        let mut talk = talk_roster();
        talk.headers[5] = "Manager".to_string();

        let err = MonthlyReport::new(&config, &roster, &talk).err().unwrap();
        assert!(matches!(err, Error::SchemaMismatch { ref missing, .. } if missing == &["上級主管"]));

        let mut no_id = roster.clone();
        no_id.headers[4] = "ID".to_string();
        assert!(MonthlyReport::new(&config, &no_id, &talk_roster()).is_err());
    }

    #[test]
    fn test_write_order() {
        let (config, roster, talk) = (config(&["Alice", "Bob"]), roster(), talk_roster());
        let report = MonthlyReport::new(&config, &roster, &talk).unwrap();
        let mut sink = MemorySink::default();
        let summary = report.write_all(&mut sink).unwrap();

        assert_eq!(
            summary.sheets,
            strings(&[
                "2022_12",
                "2022_12_Func",
                "one-on-one_TalkStatistic_122022",
                TALK_SUMMARY_SHEET,
                SUPERVISOR_SHEET,
            ])
        );
        assert_eq!(sink.merged, strings(&["2022_12"]));
        assert_eq!(summary.talk_rows, 2);
        assert_eq!(sink.table(SUPERVISOR_SHEET).len(), 6);
    }

    #[test]
    fn test_generate_from_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let roster_path = dir.path().join("IT.xlsx");

        let mut input = XlsxSink::new(&roster_path);
        input.write_table(&roster()).unwrap();
        input.write_table(&talk_roster()).unwrap();

        let mut config = config(&["Alice", "Bob"]);
        config.roster = roster_path;
        config.output_dir = dir.path().to_path_buf();

        let mut sink = XlsxSink::new(config.output_path());
        let summary = generate(&config, &mut sink).unwrap();
        assert_eq!(summary.roster_rows, 3);
        assert_eq!(summary.working_days, 21);

        let book = reader::open_workbook(&config.output_path()).unwrap();
        assert_eq!(reader::sheet_names(&book), summary.sheets);
        let stats = reader::read_table(&book, "2022_12_Func").unwrap();
        assert_eq!(stats.headers.len(), 13);
        assert_eq!(stats.len(), 31);
    }
}
