use crate::error::{CashflowError, Result};
use chrono::{Datelike, Days, NaiveDate};

/// Inclusive list of every calendar date from `start` to `end`.
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        dates.push(current);
        current = current.succ_opt().unwrap_or(current);
        if dates.last() == Some(&current) {
            break;
        }
    }
    dates
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap()
        .checked_sub_days(Days::new(1))
        .unwrap()
}

pub fn is_month_end(date: NaiveDate) -> bool {
    date == last_day_of_month(date.year(), date.month())
}

/// Monday = 0 .. Sunday = 6, matching the original feature encoding.
pub fn day_of_week_index(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    day_of_week_index(date) >= 5
}

pub fn weekday_name(date: NaiveDate) -> &'static str {
    match day_of_week_index(date) {
        0 => "Monday",
        1 => "Tuesday",
        2 => "Wednesday",
        3 => "Thursday",
        4 => "Friday",
        5 => "Saturday",
        _ => "Sunday",
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (ddof = 0). Empty slice yields 0.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Nearest-rank quantile. The returned bound is always an attained sample
/// value, which makes winsorization a fixed point: clipping at these bounds
/// and re-querying the same quantile yields the same bound.
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(CashflowError::InsufficientData {
            stage: "quantile".to_string(),
            details: "cannot take quantile of empty series".to_string(),
        });
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(CashflowError::InvalidPercentile(q));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let pos = q * (sorted.len() - 1) as f64;
    let idx = (pos.round() as usize).min(sorted.len() - 1);
    Ok(sorted[idx])
}

/// Percentage-safe round to two decimal places, used wherever totals feed
/// threshold comparisons.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
