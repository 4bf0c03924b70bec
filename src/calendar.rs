//! Working-day calendar for a single month.
//!
//! Weeks are the rows of the month grid, so the first week of a month may be
//! short. The row start is passed in explicitly as a [`WeekStart`].

use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use clap::ValueEnum;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;

/// First day of a calendar row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    fn offset(self, day: Weekday) -> u32 {
        match self {
            WeekStart::Sunday => day.num_days_from_sunday(),
            WeekStart::Monday => day.num_days_from_monday(),
        }
    }
}

/// `Week1`..`Week5`. Days in a sixth grid row carry no label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WeekLabel(u32);

impl WeekLabel {
    pub fn from_index(index: u32) -> Option<Self> {
        (1..=5).contains(&index).then_some(WeekLabel(index))
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WeekLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Week{}", self.index())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingDay {
    pub date: NaiveDate,
    pub week: Option<WeekLabel>,
}

impl WorkingDay {
    /// Week label as written in the sheet header (empty past the fifth row).
    pub fn week_text(&self) -> String {
        self.week.map(|w| w.to_string()).unwrap_or_default()
    }
}

pub type HolidaySet = BTreeSet<NaiveDate>;

/// A validated year/month pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Month {
    first_day: NaiveDate,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidDateRange(format!(
                "month {} is outside 1-12",
                month
            )));
        }
        let first_day = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            Error::InvalidDateRange(format!("year {} is not representable", year))
        })?;
        Ok(Self { first_day })
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn days_in_month(&self) -> u32 {
        let (y, m) = if self.month() == 12 {
            (self.year() + 1, 1)
        } else {
            (self.year(), self.month() + 1)
        };
        match NaiveDate::from_ymd_opt(y, m, 1) {
            Some(next) => next.signed_duration_since(self.first_day).num_days() as u32,
            // December of chrono's last representable year.
            None => 31,
        }
    }

    /// `2022_12`
    pub fn sheet_stamp(&self) -> String {
        format!("{}_{:02}", self.year(), self.month())
    }

    /// `122022`
    pub fn talk_stamp(&self) -> String {
        format!("{:02}{}", self.month(), self.year())
    }

    /// `Dec 2022`
    pub fn label(&self) -> String {
        self.first_day.format("%b %Y").to_string()
    }
}

/// Parse a holiday written as `2022/12/26`, `2022/1/3` or `2022-12-26`.
pub fn parse_holiday(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y/%m/%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
        .map_err(|_| Error::InvalidDateRange(format!("invalid holiday date \"{}\"", text)))
}

pub fn parse_holidays<S: AsRef<str>>(items: &[S]) -> Result<HolidaySet> {
    items.iter().map(|s| parse_holiday(s.as_ref())).collect()
}

/// Sheet text for a date: `2022/12/1`.
pub fn format_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.year(), date.month(), date.day())
}

/// 1-based row of `date` in its month grid.
pub fn week_of_month(date: NaiveDate, week_start: WeekStart) -> u32 {
    let first = date.with_day(1).unwrap_or(date);
    let lead = week_start.offset(first.weekday());
    (lead + date.day() - 1) / 7 + 1
}

pub fn all_days(month: Month) -> Vec<NaiveDate> {
    month
        .first_day()
        .iter_days()
        .take(month.days_in_month() as usize)
        .collect()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn working_days(month: Month, holidays: &HolidaySet, week_start: WeekStart) -> Vec<WorkingDay> {
    all_days(month)
        .into_iter()
        .filter(|d| !is_weekend(*d) && !holidays.contains(d))
        .map(|date| WorkingDay {
            date,
            week: WeekLabel::from_index(week_of_month(date, week_start)),
        })
        .collect()
}
