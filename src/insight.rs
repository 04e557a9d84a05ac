//! Insight Engine: descriptive statistics over the historical feature
//! series plus forecast risk, combined into a weighted 0-100 risk score,
//! a letter grade and categorized strengths/weaknesses.
//!
//! Every analysis group is a pure function of its inputs; the risk score is
//! a fixed threshold table, not a learned model.

use crate::error::{CashflowError, Result};
use crate::features::resolve_category;
use crate::schema::{
    DailyFeatureRow, ExpenseCategory, ExpenseStability, FinancialInsight, IncomeStability,
    PeakTime, PipelineConfig, RiskLevel, SavingsConsistency, ShortfallDay, SpendingPattern,
    Transaction,
};
use crate::utils::{self, round2};
use chrono::{NaiveDate, Timelike};
use log::info;
use std::collections::BTreeMap;

/// Maps a coefficient of variation to the income stability bucket and its
/// numeric score. The lower bucket owns its upper boundary exclusively:
/// cv = 0.1499.. is stable, cv = 0.15 is moderate.
pub fn income_stability_bucket(cv: f64) -> (IncomeStability, f64) {
    if cv < 0.15 {
        (IncomeStability::Stable, 90.0)
    } else if cv < 0.30 {
        (IncomeStability::Moderate, 70.0)
    } else {
        (IncomeStability::Volatile, 40.0)
    }
}

pub fn expense_stability_bucket(cv: f64) -> ExpenseStability {
    if cv < 0.15 {
        ExpenseStability::Consistent
    } else if cv < 0.30 {
        ExpenseStability::Variable
    } else {
        ExpenseStability::Erratic
    }
}

pub fn savings_consistency_bucket(positive_fraction: f64) -> SavingsConsistency {
    if positive_fraction >= 0.8 {
        SavingsConsistency::Always
    } else if positive_fraction >= 0.6 {
        SavingsConsistency::Often
    } else if positive_fraction >= 0.4 {
        SavingsConsistency::Sometimes
    } else if positive_fraction >= 0.2 {
        SavingsConsistency::Rarely
    } else {
        SavingsConsistency::Never
    }
}

struct IncomeStats {
    avg_daily_income: f64,
    stability: IncomeStability,
    stability_score: f64,
    growth_rate: f64,
    lowest_week: f64,
    highest_week: f64,
    weekend_boost: f64,
}

fn analyze_income(features: &[DailyFeatureRow]) -> IncomeStats {
    let incomes: Vec<f64> = features
        .iter()
        .map(|r| r.total_income)
        .filter(|v| *v > 0.0)
        .collect();

    if incomes.is_empty() {
        return IncomeStats {
            avg_daily_income: 0.0,
            stability: IncomeStability::NoData,
            stability_score: 50.0,
            growth_rate: 0.0,
            lowest_week: 0.0,
            highest_week: 0.0,
            weekend_boost: 0.0,
        };
    }

    let avg = utils::mean(&incomes);
    let (stability, stability_score) = if avg > 0.0 {
        let cv = utils::std_dev(&incomes) / avg;
        income_stability_bucket(cv)
    } else {
        (IncomeStability::Unknown, 50.0)
    };

    // Weekly totals over chronological chunks of 7 days; only weeks with
    // income contribute to the min/max spread.
    let weekly: Vec<f64> = features
        .chunks(7)
        .map(|week| week.iter().map(|r| r.total_income).sum::<f64>())
        .filter(|total| *total > 0.0)
        .collect();
    let lowest_week = weekly.iter().cloned().fold(f64::INFINITY, f64::min);
    let highest_week = weekly.iter().cloned().fold(0.0, f64::max);
    let lowest_week = if lowest_week.is_finite() { lowest_week } else { 0.0 };

    // Trailing 15 days compared against the prior 15.
    let growth_rate = if features.len() >= 30 {
        let n = features.len();
        let prior: f64 = features[n - 30..n - 15].iter().map(|r| r.total_income).sum();
        let trailing: f64 = features[n - 15..].iter().map(|r| r.total_income).sum();
        if prior > 0.0 {
            (trailing - prior) / prior * 100.0
        } else {
            0.0
        }
    } else {
        0.0
    };

    let weekend: Vec<f64> = features
        .iter()
        .filter(|r| r.is_weekend)
        .map(|r| r.total_income)
        .collect();
    let weekday: Vec<f64> = features
        .iter()
        .filter(|r| !r.is_weekend)
        .map(|r| r.total_income)
        .collect();
    let weekend_boost = if !weekend.is_empty() && !weekday.is_empty() {
        let avg_weekend = utils::mean(&weekend);
        let avg_weekday = utils::mean(&weekday);
        if avg_weekday > 0.0 {
            (avg_weekend - avg_weekday) / avg_weekday * 100.0
        } else {
            0.0
        }
    } else {
        0.0
    };

    IncomeStats {
        avg_daily_income: round2(avg),
        stability,
        stability_score,
        growth_rate: round2(growth_rate),
        lowest_week: round2(lowest_week),
        highest_week: round2(highest_week),
        weekend_boost: round2(weekend_boost),
    }
}

struct ExpenseStats {
    avg_daily_expense: f64,
    stability: ExpenseStability,
    top_category: Option<ExpenseCategory>,
    top_category_amount: f64,
    top_category_percent: f64,
    unnecessary_spending: f64,
}

fn analyze_expenses(
    features: &[DailyFeatureRow],
    transactions: &[Transaction],
    high_value_threshold: f64,
) -> ExpenseStats {
    let expenses: Vec<f64> = features.iter().map(|r| r.total_expense).collect();
    let avg = utils::mean(&expenses);

    let stability = if avg > 0.0 {
        expense_stability_bucket(utils::std_dev(&expenses) / avg)
    } else {
        ExpenseStability::NoData
    };

    let mut category_totals: BTreeMap<ExpenseCategory, f64> = BTreeMap::new();
    let mut unnecessary = 0.0;
    for tx in transactions {
        if tx.is_income() {
            continue;
        }
        let category = resolve_category(tx);
        *category_totals.entry(category).or_insert(0.0) += tx.magnitude();
        if category.is_discretionary() && tx.magnitude() > high_value_threshold {
            unnecessary += tx.magnitude();
        }
    }

    let (top_category, top_amount) = category_totals
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(cat, amount)| (Some(*cat), *amount))
        .unwrap_or((None, 0.0));
    let total_expense: f64 = category_totals.values().sum();
    let top_percent = if total_expense > 0.0 {
        top_amount / total_expense * 100.0
    } else {
        0.0
    };

    ExpenseStats {
        avg_daily_expense: round2(avg),
        stability,
        top_category,
        top_category_amount: round2(top_amount),
        top_category_percent: round2(top_percent),
        unnecessary_spending: round2(unnecessary),
    }
}

struct SavingsStats {
    avg_daily_savings: f64,
    savings_rate: f64,
    total_savings: f64,
    consistency: SavingsConsistency,
    days_with_zero_savings: u32,
}

fn analyze_savings(features: &[DailyFeatureRow]) -> SavingsStats {
    let nets: Vec<f64> = features.iter().map(|r| r.net_amount).collect();
    let positive_days = nets.iter().filter(|v| **v > 0.0).count();
    let zero_days = nets.iter().filter(|v| **v == 0.0).count();

    let total_savings: f64 = nets.iter().sum();
    let total_income: f64 = features.iter().map(|r| r.total_income).sum();
    let savings_rate = if total_income > 0.0 {
        total_savings / total_income * 100.0
    } else {
        0.0
    };

    SavingsStats {
        avg_daily_savings: round2(utils::mean(&nets)),
        savings_rate: round2(savings_rate),
        total_savings: round2(total_savings),
        consistency: savings_consistency_bucket(positive_days as f64 / features.len() as f64),
        days_with_zero_savings: zero_days as u32,
    }
}

struct CashflowStats {
    avg_balance: f64,
    lowest_balance: f64,
    lowest_balance_date: Option<NaiveDate>,
    low_balance_days: u32,
    negative_days: u32,
    crunch_risk: RiskLevel,
}

/// Balance-derived health. Histories without any balance information get a
/// zeroed block with crunch risk "low" (no evidence either way); the
/// balance-tier of the risk score still penalizes the zero average.
fn analyze_cashflow(features: &[DailyFeatureRow], low_balance_threshold: f64) -> CashflowStats {
    let negative_days = features.iter().filter(|r| r.net_amount < 0.0).count() as u32;

    let balances: Vec<(NaiveDate, f64)> = features
        .iter()
        .filter_map(|r| r.closing_balance.map(|b| (r.date, b)))
        .collect();

    if balances.is_empty() {
        return CashflowStats {
            avg_balance: 0.0,
            lowest_balance: 0.0,
            lowest_balance_date: None,
            low_balance_days: 0,
            negative_days,
            crunch_risk: RiskLevel::Low,
        };
    }

    let values: Vec<f64> = balances.iter().map(|(_, b)| *b).collect();
    let avg = utils::mean(&values);
    let (lowest_date, lowest) = balances
        .iter()
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(d, b)| (*d, *b))
        .unwrap();
    let low_balance_days = values.iter().filter(|b| **b < low_balance_threshold).count() as u32;

    let crunch_risk = if lowest < 200.0 || low_balance_days > 7 {
        RiskLevel::Critical
    } else if lowest < 500.0 || low_balance_days > 3 {
        RiskLevel::High
    } else if lowest < 1000.0 || low_balance_days > 1 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    CashflowStats {
        avg_balance: round2(avg),
        lowest_balance: round2(lowest),
        lowest_balance_date: Some(lowest_date),
        low_balance_days,
        negative_days,
        crunch_risk,
    }
}

struct BehaviorStats {
    impulsive_purchases: u32,
    pattern: SpendingPattern,
    average_transaction_size: f64,
    high_value_transactions: u32,
    peak_day: String,
    peak_time: PeakTime,
}

fn analyze_behavior(transactions: &[Transaction], high_value_threshold: f64) -> BehaviorStats {
    let expense_txs: Vec<&Transaction> =
        transactions.iter().filter(|t| !t.is_income()).collect();

    if expense_txs.is_empty() {
        return BehaviorStats {
            impulsive_purchases: 0,
            pattern: SpendingPattern::Controlled,
            average_transaction_size: 0.0,
            high_value_transactions: 0,
            peak_day: "Unknown".to_string(),
            peak_time: PeakTime::Evening,
        };
    }

    let impulsive = expense_txs
        .iter()
        .filter(|t| t.magnitude() > high_value_threshold && resolve_category(t).is_discretionary())
        .count() as u32;
    let high_value = expense_txs
        .iter()
        .filter(|t| t.magnitude() > high_value_threshold)
        .count() as u32;
    let avg_size =
        expense_txs.iter().map(|t| t.magnitude()).sum::<f64>() / expense_txs.len() as f64;

    let pattern = if impulsive > 5 || high_value > 10 {
        SpendingPattern::Impulsive
    } else if impulsive > 2 || high_value > 5 {
        SpendingPattern::Moderate
    } else {
        SpendingPattern::Controlled
    };

    // Peak weekday by transaction count; earliest weekday wins ties.
    let mut day_counts = [0u32; 7];
    for tx in &expense_txs {
        day_counts[utils::day_of_week_index(tx.date()) as usize] += 1;
    }
    let peak_idx = day_counts
        .iter()
        .enumerate()
        .max_by_key(|(i, count)| (**count, 7 - *i))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let peak_day = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"]
        [peak_idx]
        .to_string();

    let mut time_counts = [0u32; 3]; // morning, afternoon, evening
    for tx in &expense_txs {
        let hour = tx.timestamp.hour();
        let slot = if (6..12).contains(&hour) {
            0
        } else if (12..18).contains(&hour) {
            1
        } else {
            2
        };
        time_counts[slot] += 1;
    }
    let peak_time = match time_counts
        .iter()
        .enumerate()
        .max_by_key(|(i, count)| (**count, 3 - *i))
        .map(|(i, _)| i)
        .unwrap_or(2)
    {
        0 => PeakTime::Morning,
        1 => PeakTime::Afternoon,
        _ => PeakTime::Evening,
    };

    BehaviorStats {
        impulsive_purchases: impulsive,
        pattern,
        average_transaction_size: round2(avg_size),
        high_value_transactions: high_value,
        peak_day,
        peak_time,
    }
}

struct ForecastRisk {
    shortfall_days: u32,
    shortfall_amount: f64,
    first_deficit: Option<NaiveDate>,
}

fn analyze_forecast_risk(shortfall: &[ShortfallDay]) -> ForecastRisk {
    let mut days = 0u32;
    let mut total = 0.0;
    let mut first = None;
    for day in shortfall {
        if day.predicted_net < 0.0 {
            days += 1;
            total += day.predicted_net.abs();
            if first.is_none() {
                first = Some(day.date);
            }
        }
    }
    ForecastRisk {
        shortfall_days: days,
        shortfall_amount: round2(total),
        first_deficit: first,
    }
}

fn grade_for_score(score: f64) -> &'static str {
    if score >= 90.0 {
        "A+"
    } else if score >= 85.0 {
        "A"
    } else if score >= 75.0 {
        "B+"
    } else if score >= 65.0 {
        "B"
    } else if score >= 50.0 {
        "C"
    } else {
        "D"
    }
}

fn risk_level_for_score(score: f64) -> RiskLevel {
    if score >= 80.0 {
        RiskLevel::Low
    } else if score >= 60.0 {
        RiskLevel::Medium
    } else if score >= 40.0 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

/// Sentinel for "current savings can never fund the emergency buffer".
const MONTHS_TO_FUND_CAP: f64 = 999.0;

/// Run the full analysis over one user's historical window and shortfall
/// projection. `features` is the income/daily series (chronological,
/// gap-free); `transactions` the classified list for the same window.
pub fn analyze(
    features: &[DailyFeatureRow],
    transactions: &[Transaction],
    shortfall: &[ShortfallDay],
    config: &PipelineConfig,
    today: NaiveDate,
) -> Result<FinancialInsight> {
    if features.is_empty() {
        return Err(CashflowError::InsufficientData {
            stage: "insight".to_string(),
            details: "no daily feature rows in the analysis window".to_string(),
        });
    }

    let income = analyze_income(features);
    let expense = analyze_expenses(features, transactions, config.high_value_threshold);
    let savings = analyze_savings(features);
    let cashflow = analyze_cashflow(features, config.low_balance_threshold);
    let behavior = analyze_behavior(transactions, config.high_value_threshold);
    let risk = analyze_forecast_risk(shortfall);

    let mut score = 0.0;
    let mut risk_factors = Vec::new();
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();

    // Income stability: up to 20 points, scaled from the 0-100 bucket score.
    score += income.stability_score / 100.0 * 20.0;
    if income.stability_score < 50.0 {
        risk_factors.push("Highly volatile income".to_string());
        weaknesses.push("Inconsistent earnings pattern".to_string());
    } else {
        strengths.push("Stable income source".to_string());
    }

    // Savings rate: up to 25 points.
    if savings.savings_rate > 20.0 {
        score += 25.0;
        strengths.push(format!("Good savings rate ({:.1}%)", savings.savings_rate));
    } else if savings.savings_rate > 10.0 {
        score += 15.0;
    } else if savings.savings_rate > 0.0 {
        score += 5.0;
        weaknesses.push("Low savings rate".to_string());
    } else {
        risk_factors.push("No savings".to_string());
        weaknesses.push("Unable to save money".to_string());
    }

    // Balance health: up to 20 points.
    if cashflow.avg_balance > 5000.0 {
        score += 20.0;
        strengths.push("Healthy balance maintained".to_string());
    } else if cashflow.avg_balance > 2000.0 {
        score += 10.0;
    } else if cashflow.avg_balance > 500.0 {
        score += 5.0;
    } else {
        risk_factors.push("Very low balance".to_string());
        weaknesses.push("Insufficient emergency buffer".to_string());
    }

    // Cashflow consistency: up to 15 points.
    if cashflow.negative_days == 0 {
        score += 15.0;
    } else if cashflow.negative_days < 3 {
        score += 10.0;
    } else if cashflow.negative_days < 7 {
        score += 5.0;
        weaknesses.push("Frequent negative cashflow days".to_string());
    } else {
        risk_factors.push("Frequent negative cashflow".to_string());
        weaknesses.push("Poor cashflow management".to_string());
    }

    // Spending control: up to 10 points.
    match behavior.pattern {
        SpendingPattern::Controlled => {
            score += 10.0;
            strengths.push("Controlled spending habits".to_string());
        }
        SpendingPattern::Moderate => score += 5.0,
        SpendingPattern::Impulsive => {
            risk_factors.push("Impulsive spending".to_string());
            weaknesses.push("Need better expense control".to_string());
        }
    }

    // Absence of forecast shortfall: up to 10 points.
    if risk.shortfall_days == 0 {
        score += 10.0;
    } else if risk.shortfall_days < 3 {
        score += 5.0;
    } else {
        risk_factors.push(format!("{} shortfall days ahead", risk.shortfall_days));
        weaknesses.push("High shortfall risk in coming days".to_string());
    }

    let overall_risk_level = risk_level_for_score(score);
    let grade = grade_for_score(score);

    let recommended_daily_savings = round2(
        (income.avg_daily_income * 0.1).max(config.savings_floor),
    );
    let recommended_emergency_fund = round2(income.avg_daily_income * 30.0);
    let months_to_emergency_fund = if savings.total_savings > 0.0 {
        round2(recommended_emergency_fund / (savings.total_savings / 30.0))
    } else {
        MONTHS_TO_FUND_CAP
    };

    let mut summary = format!(
        "Daily income Rs.{:.0}, saving {:.1}% of earnings. Financial risk: {}. ",
        income.avg_daily_income, savings.savings_rate, overall_risk_level
    );
    if risk.shortfall_days > 0 {
        summary.push_str(&format!(
            "{} shortfall days predicted. ",
            risk.shortfall_days
        ));
    }

    info!(
        "insight for {}: score={:.1} grade={} risk={}",
        today, score, grade, overall_risk_level
    );

    Ok(FinancialInsight {
        analysis_date: today,
        analysis_period_days: config.lookback_days,

        avg_daily_income: income.avg_daily_income,
        income_stability: income.stability,
        income_stability_score: income.stability_score,
        income_growth_rate: income.growth_rate,
        lowest_income_week: income.lowest_week,
        highest_income_week: income.highest_week,
        weekend_income_boost: income.weekend_boost,

        avg_daily_expense: expense.avg_daily_expense,
        expense_stability: expense.stability,
        top_expense_category: expense.top_category,
        top_expense_category_amount: expense.top_category_amount,
        top_expense_category_percent: expense.top_category_percent,
        unnecessary_spending_amount: expense.unnecessary_spending,

        avg_daily_savings: savings.avg_daily_savings,
        savings_rate: savings.savings_rate,
        total_savings_last30_days: savings.total_savings,
        savings_consistency: savings.consistency,
        days_with_zero_savings: savings.days_with_zero_savings,

        avg_daily_balance: cashflow.avg_balance,
        lowest_balance: cashflow.lowest_balance,
        lowest_balance_date: cashflow.lowest_balance_date,
        days_with_negative_cashflow: cashflow.negative_days,
        days_with_low_balance: cashflow.low_balance_days,
        cash_crunch_risk: cashflow.crunch_risk,

        impulsive_purchases: behavior.impulsive_purchases,
        spending_pattern_type: behavior.pattern,
        average_transaction_size: behavior.average_transaction_size,
        high_value_transactions: behavior.high_value_transactions,
        spending_peak_day: behavior.peak_day,
        spending_peak_time: behavior.peak_time,

        predicted_shortfall_days: risk.shortfall_days,
        predicted_shortfall_amount: risk.shortfall_amount,
        next_low_balance_date: risk.first_deficit,

        overall_risk_level,
        risk_score: round2(score),
        risk_factors,
        strengths,
        weaknesses,

        recommended_daily_savings,
        recommended_emergency_fund,
        months_to_emergency_fund,

        financial_health_grade: grade.to_string(),
        insights_summary: summary,
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn row(date: NaiveDate, income: f64, expense: f64, balance: Option<f64>) -> DailyFeatureRow {
        DailyFeatureRow {
            date,
            net_amount: income - expense,
            tx_count: 1,
            total_income: income,
            total_expense: expense,
            closing_balance: balance,
            rolling_7_mean: 0.0,
            rolling_30_mean: 0.0,
            rolling_7_std: 0.0,
            rolling_30_std: 0.0,
            prev_day_net: 0.0,
            lag7_mean: 0.0,
            day_of_week: utils::day_of_week_index(date),
            is_weekend: utils::is_weekend(date),
            month: 1,
            is_month_end: false,
        }
    }

    fn days(n: u64, f: impl Fn(u64) -> (f64, f64, Option<f64>)) -> Vec<DailyFeatureRow> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                let (income, expense, balance) = f(i);
                row(start.checked_add_days(Days::new(i)).unwrap(), income, expense, balance)
            })
            .collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    #[test]
    fn test_stability_bucket_boundaries() {
        assert_eq!(
            income_stability_bucket(0.149999),
            (IncomeStability::Stable, 90.0)
        );
        assert_eq!(
            income_stability_bucket(0.15),
            (IncomeStability::Moderate, 70.0)
        );
        assert_eq!(
            income_stability_bucket(0.299999),
            (IncomeStability::Moderate, 70.0)
        );
        assert_eq!(
            income_stability_bucket(0.30),
            (IncomeStability::Volatile, 40.0)
        );
    }

    #[test]
    fn test_expense_stability_buckets() {
        assert_eq!(expense_stability_bucket(0.0), ExpenseStability::Consistent);
        assert_eq!(expense_stability_bucket(0.15), ExpenseStability::Variable);
        assert_eq!(expense_stability_bucket(0.35), ExpenseStability::Erratic);
    }

    #[test]
    fn test_savings_consistency_tiers() {
        assert_eq!(savings_consistency_bucket(0.85), SavingsConsistency::Always);
        assert_eq!(savings_consistency_bucket(0.8), SavingsConsistency::Always);
        assert_eq!(savings_consistency_bucket(0.6), SavingsConsistency::Often);
        assert_eq!(savings_consistency_bucket(0.4), SavingsConsistency::Sometimes);
        assert_eq!(savings_consistency_bucket(0.2), SavingsConsistency::Rarely);
        assert_eq!(savings_consistency_bucket(0.1), SavingsConsistency::Never);
    }

    #[test]
    fn test_empty_features_is_insufficient() {
        let config = PipelineConfig::default();
        let err = analyze(&[], &[], &[], &config, today()).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_cash_crunch_tiers() {
        let config = PipelineConfig::default();

        // lowest balance < 200 -> critical
        let features = days(10, |i| (500.0, 300.0, Some(if i == 5 { 150.0 } else { 2000.0 })));
        let insight = analyze(&features, &[], &[], &config, today()).unwrap();
        assert_eq!(insight.cash_crunch_risk, RiskLevel::Critical);
        assert_eq!(insight.lowest_balance, 150.0);
        assert_eq!(
            insight.lowest_balance_date,
            Some(NaiveDate::from_ymd_opt(2024, 1, 6).unwrap())
        );

        // lowest in [500, 1000) -> medium
        let features = days(10, |_| (500.0, 300.0, Some(900.0)));
        let insight = analyze(&features, &[], &[], &config, today()).unwrap();
        assert_eq!(insight.cash_crunch_risk, RiskLevel::Medium);

        // comfortable balances -> low
        let features = days(10, |_| (500.0, 300.0, Some(6000.0)));
        let insight = analyze(&features, &[], &[], &config, today()).unwrap();
        assert_eq!(insight.cash_crunch_risk, RiskLevel::Low);
    }

    #[test]
    fn test_no_balance_data() {
        let config = PipelineConfig::default();
        let features = days(10, |_| (500.0, 300.0, None));
        let insight = analyze(&features, &[], &[], &config, today()).unwrap();
        assert_eq!(insight.cash_crunch_risk, RiskLevel::Low);
        assert_eq!(insight.avg_daily_balance, 0.0);
        assert_eq!(insight.lowest_balance_date, None);
        // zero average balance still reads as a risk factor
        assert!(insight.risk_factors.iter().any(|f| f.contains("Very low balance")));
    }

    #[test]
    fn test_risk_score_monotonic_in_savings_rate() {
        let config = PipelineConfig::default();
        // ~5% savings rate: income 1000/day, expense 950/day
        let low_rate = days(30, |_| (1000.0, 950.0, Some(5000.0)));
        // ~25% savings rate: income 1000/day, expense 750/day
        let high_rate = days(30, |_| (1000.0, 750.0, Some(5000.0)));

        let low = analyze(&low_rate, &[], &[], &config, today()).unwrap();
        let high = analyze(&high_rate, &[], &[], &config, today()).unwrap();

        assert!((low.savings_rate - 5.0).abs() < 0.5);
        assert!((high.savings_rate - 25.0).abs() < 0.5);
        assert!(high.risk_score >= low.risk_score);
    }

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(grade_for_score(90.0), "A+");
        assert_eq!(grade_for_score(89.999), "A");
        assert_eq!(grade_for_score(85.0), "A");
        assert_eq!(grade_for_score(75.0), "B+");
        assert_eq!(grade_for_score(65.0), "B");
        assert_eq!(grade_for_score(50.0), "C");
        assert_eq!(grade_for_score(49.999), "D");
    }

    #[test]
    fn test_risk_level_buckets() {
        assert_eq!(risk_level_for_score(80.0), RiskLevel::Low);
        assert_eq!(risk_level_for_score(79.999), RiskLevel::Medium);
        assert_eq!(risk_level_for_score(60.0), RiskLevel::Medium);
        assert_eq!(risk_level_for_score(40.0), RiskLevel::High);
        assert_eq!(risk_level_for_score(39.999), RiskLevel::Critical);
    }

    #[test]
    fn test_months_to_fund_sentinel_when_not_saving() {
        let config = PipelineConfig::default();
        let features = days(30, |_| (1000.0, 1100.0, Some(2000.0)));
        let insight = analyze(&features, &[], &[], &config, today()).unwrap();
        assert_eq!(insight.months_to_emergency_fund, 999.0);
        assert!(insight.risk_factors.iter().any(|f| f == "No savings"));
    }

    #[test]
    fn test_forecast_risk_rollup() {
        let config = PipelineConfig::default();
        let features = days(30, |_| (1000.0, 500.0, Some(5000.0)));
        let shortfall = vec![
            ShortfallDay {
                date: NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
                predicted_income: 100.0,
                predicted_expense: 50.0,
                predicted_net: 50.0,
                is_deficit: false,
                risk_level: RiskLevel::Low,
            },
            ShortfallDay {
                date: NaiveDate::from_ymd_opt(2024, 2, 3).unwrap(),
                predicted_income: 100.0,
                predicted_expense: 400.0,
                predicted_net: -300.0,
                is_deficit: true,
                risk_level: RiskLevel::High,
            },
            ShortfallDay {
                date: NaiveDate::from_ymd_opt(2024, 2, 4).unwrap(),
                predicted_income: 0.0,
                predicted_expense: 200.0,
                predicted_net: -200.0,
                is_deficit: true,
                risk_level: RiskLevel::High,
            },
        ];

        let insight = analyze(&features, &[], &shortfall, &config, today()).unwrap();
        assert_eq!(insight.predicted_shortfall_days, 2);
        assert_eq!(insight.predicted_shortfall_amount, 500.0);
        assert_eq!(
            insight.next_low_balance_date,
            Some(NaiveDate::from_ymd_opt(2024, 2, 3).unwrap())
        );
        assert!(insight.insights_summary.contains("2 shortfall days"));
    }

    #[test]
    fn test_income_growth_rate_trailing_vs_prior() {
        let config = PipelineConfig::default();
        // prior 15 days at 100/day, trailing 15 at 150/day -> +50%
        let features = days(30, |i| {
            let income = if i < 15 { 100.0 } else { 150.0 };
            (income, 50.0, Some(3000.0))
        });
        let insight = analyze(&features, &[], &[], &config, today()).unwrap();
        assert!((insight.income_growth_rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_perfect_month_scores_high() {
        let config = PipelineConfig::default();
        // steady income, 25% savings, healthy balance, no deficits
        let features = days(30, |_| (1000.0, 750.0, Some(8000.0)));
        let insight = analyze(&features, &[], &[], &config, today()).unwrap();

        // 18 (stable) + 25 (rate) + 20 (balance) + 15 (no negatives)
        // + 10 (controlled) + 10 (no shortfall) = 98
        assert_eq!(insight.risk_score, 98.0);
        assert_eq!(insight.financial_health_grade, "A+");
        assert_eq!(insight.overall_risk_level, RiskLevel::Low);
        assert!(insight.strengths.iter().any(|s| s.contains("savings rate")));
    }
}
