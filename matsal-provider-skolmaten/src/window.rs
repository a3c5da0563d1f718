//! Splitting date ranges into the week windows Skolmaten understands.

use chrono::{Datelike, NaiveDate};
use matsal_core::ports::PortError;

/// One `/menu` request: `count` weeks starting at ISO week `week_of_year` of `year`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    /// Calendar year of the window.
    pub year: i32,
    /// ISO week the window starts at, never 53.
    pub week_of_year: u32,
    /// Number of weeks requested.
    pub count: i64,
}

/// Split `start..=end` into one window per calendar year.
///
/// Each window asks for one week more than the span strictly needs; the
/// upstream tolerates over-fetching but silently drops what is under-fetched.
/// Skolmaten never produces week 53, so a window starting in ISO week 53
/// asks for week 1 instead.
///
/// # Errors
///
/// Returns [`PortError::BadRange`] when `start` is after `end`.
pub fn segment(start: NaiveDate, end: NaiveDate) -> Result<Vec<WeekWindow>, PortError> {
    if start > end {
        return Err(PortError::BadRange { start, end });
    }

    let mut windows = Vec::new();
    let mut segment_start = start;

    loop {
        let year = segment_start.year();
        let segment_end = if end.year() == year {
            end
        } else {
            last_day_of(year)?
        };

        let span = (segment_end - segment_start).num_days();
        let week = segment_start.iso_week().week();

        windows.push(WeekWindow {
            year,
            week_of_year: if week > 52 { 1 } else { week },
            count: (span + 6) / 7 + 1,
        });

        segment_start = first_day_of(year + 1)?;

        if end <= segment_start {
            break;
        }
    }

    Ok(windows)
}

fn first_day_of(year: i32) -> Result<NaiveDate, PortError> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| PortError::Internal(format!("year {year} out of range")))
}

fn last_day_of(year: i32) -> Result<NaiveDate, PortError> {
    NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| PortError::Internal(format!("year {year} out of range")))
}
