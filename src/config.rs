//! Run configuration: an optional TOML file, overridden by CLI flags.

use crate::calendar::{parse_holidays, HolidaySet, Month, WeekStart};
use crate::error::{Error, Result};
use crate::metrics::Markers;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub holidays: Vec<String>,
    pub supervisors: Vec<String>,
    pub last_month_count: u32,
    pub roster: PathBuf,
    pub roster_sheet: Option<String>,
    pub talk_sheet: String,
    pub id_header: String,
    pub output_dir: PathBuf,
    pub week_start: WeekStart,
    pub markers: Markers,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            year: None,
            month: None,
            holidays: Vec::new(),
            supervisors: Vec::new(),
            last_month_count: 0,
            roster: PathBuf::from("IT.xlsx"),
            roster_sheet: None,
            talk_sheet: "one_on_one_talk_statistic".to_string(),
            id_header: "工號".to_string(),
            output_dir: PathBuf::from("."),
            week_start: WeekStart::Sunday,
            markers: Markers::default(),
        }
    }
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::InputNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text).map_err(|details| Error::Config {
            path: path.to_path_buf(),
            details,
        })
    }

    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }
}

/// Values given on the command line; `Some`/non-empty entries win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub holidays: Vec<String>,
    pub supervisors: Vec<String>,
    pub last_month_count: Option<u32>,
    pub roster: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub week_start: Option<WeekStart>,
}

/// Fully resolved settings for one report run.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub month: Month,
    pub holidays: HolidaySet,
    pub supervisors: Vec<String>,
    pub last_month_count: u32,
    pub roster: PathBuf,
    pub roster_sheet: Option<String>,
    pub talk_sheet: String,
    pub id_header: String,
    pub output_dir: PathBuf,
    pub week_start: WeekStart,
    pub markers: Markers,
}

impl ReportConfig {
    pub fn resolve(file: FileConfig, cli: Overrides) -> Result<Self> {
        let year = cli
            .year
            .or(file.year)
            .ok_or_else(|| Error::InvalidDateRange("no year given".to_string()))?;
        let month = cli
            .month
            .or(file.month)
            .ok_or_else(|| Error::InvalidDateRange("no month given".to_string()))?;
        let month = Month::new(year, month)?;

        let holiday_text = if cli.holidays.is_empty() {
            file.holidays
        } else {
            cli.holidays
        };
        let holidays = parse_holidays(&holiday_text)?;

        Ok(Self {
            month,
            holidays,
            supervisors: if cli.supervisors.is_empty() {
                file.supervisors
            } else {
                cli.supervisors
            },
            last_month_count: cli.last_month_count.unwrap_or(file.last_month_count),
            roster: cli.roster.unwrap_or(file.roster),
            roster_sheet: file.roster_sheet,
            talk_sheet: file.talk_sheet,
            id_header: file.id_header,
            output_dir: cli.output_dir.unwrap_or(file.output_dir),
            week_start: cli.week_start.unwrap_or(file.week_start),
            markers: file.markers,
        })
    }

    /// `output_2022_12.xlsx` inside the output directory.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("output_{}.xlsx", self.month.sheet_stamp()))
    }
}
