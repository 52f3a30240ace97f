//! Month arithmetic used to derive contract periods.
//!
//! All functions are pure. Offsets are whole months; results that would fall
//! outside chrono's supported range surface as [`DomainError::DateOutOfRange`].

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime};

use crate::errors::DomainError;
use crate::text::normalize_digits;

const MONTHS_PER_YEAR: i64 = 12;
const ROUND_UP_FROM_MONTH: i64 = 6;

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

pub fn last_day_of_month(date: NaiveDate) -> Result<NaiveDate, DomainError> {
    future_date(date, 0)
}

/// Inclusive number of calendar months from `start`'s month to `end`'s month.
///
/// Two dates in the same month span one month; the day of month is ignored.
pub fn month_diff(start: NaiveDate, end: NaiveDate) -> i64 {
    let years = i64::from(end.year()) - i64::from(start.year());
    let months = i64::from(end.month0()) - i64::from(start.month0());
    years * MONTHS_PER_YEAR + months + 1
}

/// First day of the month `months` before `date`'s month.
pub fn ago_date(date: NaiveDate, months: u32) -> Result<NaiveDate, DomainError> {
    first_day_of_month(date)
        .checked_sub_months(Months::new(months))
        .ok_or(DomainError::DateOutOfRange)
}

/// Last day of the month `months` after `date`'s month.
///
/// Unlike [`ago_date`] this lands on the end of the month: it marks the close
/// of a period rather than its start.
pub fn future_date(date: NaiveDate, months: u32) -> Result<NaiveDate, DomainError> {
    let following = months.checked_add(1).ok_or(DomainError::DateOutOfRange)?;
    first_day_of_month(date)
        .checked_add_months(Months::new(following))
        .and_then(|next_month| next_month.pred_opt())
        .ok_or(DomainError::DateOutOfRange)
}

/// Converts months to years, rounding up from a remainder of six months.
///
/// `None` stays `None` so a blank treatment term remains blank downstream.
pub fn round_year(months: Option<i64>) -> Option<i64> {
    months.map(|months| {
        let years = months / MONTHS_PER_YEAR;
        let remainder = months - years * MONTHS_PER_YEAR;
        if remainder >= ROUND_UP_FROM_MONTH {
            years + 1
        } else {
            years
        }
    })
}

/// `ceil(months / 12)`.
pub fn ceil_years(months: i64) -> i64 {
    let years = months / MONTHS_PER_YEAR;
    if months % MONTHS_PER_YEAR > 0 {
        years + 1
    } else {
        years
    }
}

/// Splits a month count into whole years and leftover months.
pub fn split_years_months(months: i64) -> (i64, i64) {
    (months / MONTHS_PER_YEAR, months % MONTHS_PER_YEAR)
}

/// Parses the date notations form answers arrive in.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let normalized = normalize_digits(value.trim());
    if normalized.is_empty() {
        return None;
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d", "%Y年%m月%d日", "%Y.%m.%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(&normalized, format) {
            return Some(date);
        }
    }

    if let Ok(timestamp) = chrono::DateTime::parse_from_rfc3339(&normalized) {
        return Some(timestamp.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Some(timestamp.date());
        }
    }

    None
}

/// `yyyy年M月d日`, as printed in quotation comments.
pub fn format_japanese(date: NaiveDate) -> String {
    date.format("%Y年%-m月%-d日").to_string()
}

/// `yyyymmdd`, as used in document titles.
pub fn format_compact(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}
