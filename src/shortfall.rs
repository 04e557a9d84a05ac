//! Shortfall Projector: merges the income forecast with the date-wise sum of
//! all expense-category forecasts into a single daily net projection.

use crate::error::{CashflowError, Result};
use crate::schema::{ExpenseCategory, Forecast, RiskLevel, ShortfallDay};
use log::debug;
use std::collections::BTreeMap;

/// Left-merge income and summed expense forecasts on date.
///
/// Dates without expense coverage are projected at zero expense. That is an
/// optimistic default, not an "unknown": a category whose model produced no
/// rows simply contributes nothing to the day's outflow. An absent income
/// forecast is a hard stop for this user's downstream stages.
pub fn project_shortfall(
    income: &[Forecast],
    expenses: &BTreeMap<ExpenseCategory, Vec<Forecast>>,
) -> Result<Vec<ShortfallDay>> {
    if income.is_empty() {
        return Err(CashflowError::MissingIncomeForecast);
    }

    let mut expense_by_date: BTreeMap<chrono::NaiveDate, f64> = BTreeMap::new();
    for forecasts in expenses.values() {
        for fc in forecasts {
            *expense_by_date.entry(fc.date).or_insert(0.0) += fc.predicted_amount;
        }
    }

    let mut days = Vec::with_capacity(income.len());
    for fc in income {
        let predicted_expense = expense_by_date.get(&fc.date).copied().unwrap_or(0.0);
        let predicted_net = fc.predicted_amount - predicted_expense;
        let is_deficit = predicted_net < 0.0;
        days.push(ShortfallDay {
            date: fc.date,
            predicted_income: fc.predicted_amount,
            predicted_expense,
            predicted_net,
            is_deficit,
            risk_level: if is_deficit {
                RiskLevel::High
            } else {
                RiskLevel::Low
            },
        });
    }

    debug!(
        "projected {} days, {} in deficit",
        days.len(),
        days.iter().filter(|d| d.is_deficit).count()
    );

    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fc(day: u32, amount: f64) -> Forecast {
        Forecast {
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            predicted_amount: amount,
            model: "gbdt".to_string(),
            model_confidence: 0.9,
            mape: 12.0,
        }
    }

    #[test]
    fn test_missing_income_is_hard_stop() {
        let err = project_shortfall(&[], &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, CashflowError::MissingIncomeForecast));
    }

    #[test]
    fn test_no_expense_coverage_projects_zero_expense() {
        let income: Vec<Forecast> = (1..=14).map(|d| fc(d, 500.0)).collect();
        let days = project_shortfall(&income, &BTreeMap::new()).unwrap();

        assert_eq!(days.len(), 14);
        for day in &days {
            assert_eq!(day.predicted_expense, 0.0);
            assert!(!day.is_deficit);
            assert_eq!(day.risk_level, RiskLevel::Low);
        }
    }

    #[test]
    fn test_negative_income_with_zero_expense_is_deficit() {
        let income = vec![fc(1, -100.0)];
        let days = project_shortfall(&income, &BTreeMap::new()).unwrap();
        assert!(days[0].is_deficit);
        assert_eq!(days[0].risk_level, RiskLevel::High);
    }

    #[test]
    fn test_expense_categories_sum_by_date() {
        let income = vec![fc(1, 1000.0), fc(2, 1000.0)];
        let mut expenses = BTreeMap::new();
        expenses.insert(ExpenseCategory::Food, vec![fc(1, 300.0), fc(2, 300.0)]);
        expenses.insert(ExpenseCategory::Fuel, vec![fc(1, 800.0)]);

        let days = project_shortfall(&income, &expenses).unwrap();

        assert_eq!(days[0].predicted_expense, 1100.0);
        assert_eq!(days[0].predicted_net, -100.0);
        assert!(days[0].is_deficit);

        // day 2 has only food coverage; fuel contributes nothing
        assert_eq!(days[1].predicted_expense, 300.0);
        assert!(!days[1].is_deficit);
    }

    #[test]
    fn test_output_keeps_income_dates() {
        let income = vec![fc(3, 100.0), fc(4, 100.0), fc(5, 100.0)];
        let mut expenses = BTreeMap::new();
        // expense forecast extends beyond the income window; extra dates drop
        expenses.insert(
            ExpenseCategory::Misc,
            vec![fc(4, 50.0), fc(9, 999.0)],
        );

        let days = project_shortfall(&income, &expenses).unwrap();
        assert_eq!(days.len(), 3);
        assert_eq!(days[1].predicted_expense, 50.0);
        let first = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let last = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        assert!(days.iter().all(|d| d.date >= first && d.date <= last));
    }
}
