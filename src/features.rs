//! Feature Builder: turns a chronological transaction list into gap-free
//! daily feature series ready for model training.
//!
//! One income series per user, plus one independent series per expense
//! category. All rolling statistics are computed over the winsorized net
//! series so a single anomalous transaction cannot dominate the model fit.

use crate::categorize::categorize_expense;
use crate::error::{CashflowError, Result};
use crate::schema::{DailyFeatureRow, ExpenseCategory, Transaction};
use crate::utils;
use chrono::{Datelike, NaiveDate};
use log::debug;
use std::collections::BTreeMap;

#[derive(Default, Clone)]
struct DayBucket {
    net: f64,
    count: u32,
    income: f64,
    expense: f64,
    balance: Option<f64>,
}

/// Clip a series at the mirrored percentile bounds (e.g. `pct = 0.99` clips
/// at the 1st and 99th percentiles). Empty input passes through. The bounds
/// are nearest-rank quantiles, so applying this twice at the same percentile
/// is a no-op.
pub fn winsorize(values: &[f64], pct: f64) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Ok(Vec::new());
    }
    if !(0.5..=1.0).contains(&pct) {
        return Err(CashflowError::InvalidPercentile(pct));
    }

    let low = utils::quantile(values, 1.0 - pct)?;
    let high = utils::quantile(values, pct)?;

    Ok(values.iter().map(|v| v.clamp(low, high)).collect())
}

/// Build the income feature series: signed daily net over the full covered
/// window, with zero-activity days synthesized so dates are strictly
/// increasing and gap-free.
///
/// The closing balance of a synthesized day carries the last known balance
/// forward; days before the first known balance stay `None`.
///
/// Empty input yields an empty series — the caller treats that as
/// "insufficient data", not as an error.
pub fn build_daily_features(
    transactions: &[Transaction],
    winsorize_pct: f64,
) -> Result<Vec<DailyFeatureRow>> {
    if transactions.is_empty() {
        return Ok(Vec::new());
    }

    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    sorted.sort_by_key(|t| t.timestamp);

    let mut buckets: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();
    for tx in &sorted {
        let bucket = buckets.entry(tx.date()).or_default();
        bucket.net += tx.amount;
        bucket.count += 1;
        if tx.is_income() {
            bucket.income += tx.amount;
        } else {
            bucket.expense += tx.magnitude();
        }
        if tx.balance.is_some() {
            bucket.balance = tx.balance;
        }
    }

    let start = *buckets.keys().next().unwrap();
    let end = *buckets.keys().next_back().unwrap();

    emit_series(&buckets, start, end, winsorize_pct)
}

/// Build one independent daily spend series per expense category. The series
/// value is the positive daily spend in that category. Categories with no
/// transactions are absent from the map.
///
/// Transactions without an upstream category fall back to the keyword
/// classifier.
pub fn build_expense_category_series(
    transactions: &[Transaction],
    winsorize_pct: f64,
) -> Result<BTreeMap<ExpenseCategory, Vec<DailyFeatureRow>>> {
    let mut per_category: BTreeMap<ExpenseCategory, BTreeMap<NaiveDate, DayBucket>> =
        BTreeMap::new();

    for tx in transactions {
        if tx.is_income() {
            continue;
        }
        let category = tx
            .category
            .unwrap_or_else(|| categorize_expense(&tx.narration, tx.magnitude()));

        let bucket = per_category
            .entry(category)
            .or_default()
            .entry(tx.date())
            .or_default();
        bucket.net += tx.magnitude();
        bucket.expense += tx.magnitude();
        bucket.count += 1;
    }

    let mut series = BTreeMap::new();
    for (category, buckets) in per_category {
        let start = *buckets.keys().next().unwrap();
        let end = *buckets.keys().next_back().unwrap();
        let rows = emit_series(&buckets, start, end, winsorize_pct)?;
        debug!("built {} daily rows for category {}", rows.len(), category);
        series.insert(category, rows);
    }

    Ok(series)
}

/// Resolve a transaction's category, preferring upstream classification.
pub fn resolve_category(tx: &Transaction) -> ExpenseCategory {
    tx.category
        .unwrap_or_else(|| categorize_expense(&tx.narration, tx.magnitude()))
}

fn emit_series(
    buckets: &BTreeMap<NaiveDate, DayBucket>,
    start: NaiveDate,
    end: NaiveDate,
    winsorize_pct: f64,
) -> Result<Vec<DailyFeatureRow>> {
    let dates = utils::days_in_range(start, end);

    let mut raw_net = Vec::with_capacity(dates.len());
    let mut day_buckets = Vec::with_capacity(dates.len());
    let mut carried_balance: Option<f64> = None;

    for date in &dates {
        let mut bucket = buckets.get(date).cloned().unwrap_or_default();
        if bucket.balance.is_some() {
            carried_balance = bucket.balance;
        } else {
            bucket.balance = carried_balance;
        }
        raw_net.push(bucket.net);
        day_buckets.push(bucket);
    }

    let net = winsorize(&raw_net, winsorize_pct)?;

    let mut rows = Vec::with_capacity(dates.len());
    for (i, date) in dates.iter().enumerate() {
        let window7 = &net[i.saturating_sub(6)..=i];
        let window30 = &net[i.saturating_sub(29)..=i];

        let prev_day_net = if i > 0 { net[i - 1] } else { 0.0 };

        // Trailing-week mean ending 7 days back: values at t-13 .. t-7.
        let lag7_mean = if i >= 7 {
            let lo = i.saturating_sub(13);
            utils::mean(&net[lo..=i - 7])
        } else {
            0.0
        };

        let bucket = &day_buckets[i];
        rows.push(DailyFeatureRow {
            date: *date,
            net_amount: net[i],
            tx_count: bucket.count,
            total_income: bucket.income,
            total_expense: bucket.expense,
            closing_balance: bucket.balance,
            rolling_7_mean: utils::mean(window7),
            rolling_30_mean: utils::mean(window30),
            rolling_7_std: utils::std_dev(window7),
            rolling_30_std: utils::std_dev(window30),
            prev_day_net,
            lag7_mean,
            day_of_week: utils::day_of_week_index(*date),
            is_weekend: utils::is_weekend(*date),
            month: date.month(),
            is_month_end: utils::is_month_end(*date),
        });
    }

    Ok(rows)
}
