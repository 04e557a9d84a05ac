//! Financial-health analytics for transaction histories.
//!
//! The pipeline runs five stages over one user's classified transactions:
//! daily feature engineering, per-series gradient-boosted forecasting, a
//! shortfall projection over the forecast horizon, descriptive insight
//! scoring, and rule-driven action cards. Everything is deterministic for a
//! given transaction list, configuration and analysis date.
//!
//! ```
//! use cashflow_insight::{analyze_user, PipelineConfig, Transaction};
//! use chrono::{Days, NaiveDate};
//!
//! # fn main() -> cashflow_insight::Result<()> {
//! let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
//! let transactions: Vec<Transaction> = (0..30)
//!     .map(|i| Transaction {
//!         id: format!("t{}", i),
//!         timestamp: start
//!             .checked_add_days(Days::new(i))
//!             .unwrap()
//!             .and_hms_opt(9, 0, 0)
//!             .unwrap(),
//!         amount: if i % 7 == 0 { 1500.0 } else { -200.0 },
//!         narration: "upi transfer".to_string(),
//!         category: None,
//!         balance: Some(4000.0),
//!     })
//!     .collect();
//!
//! let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//! let analysis = analyze_user(&transactions, &PipelineConfig::default(), today)?;
//!
//! assert_eq!(analysis.income_forecast.len(), 14);
//! println!("health grade: {}", analysis.insight.financial_health_grade);
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod categorize;
pub mod error;
pub mod features;
pub mod forecast;
pub mod insight;
pub mod interfaces;
pub mod schema;
pub mod shortfall;
pub mod utils;

pub use error::{CashflowError, Result};
pub use schema::{
    ActionCard, DailyFeatureRow, ExpenseCategory, FinancialInsight, Forecast, PipelineConfig,
    RiskLevel, SeriesKind, ShortfallDay, Transaction,
};

use crate::forecast::Forecaster;
use crate::interfaces::{ActionCardSink, ForecastSink, InsightSink, TransactionSource};
use chrono::{Days, NaiveDate};
use log::{info, warn};
use std::collections::BTreeMap;

/// Every artifact one pipeline run produces for one user.
#[derive(Debug, Clone)]
pub struct UserAnalysis {
    pub features: Vec<DailyFeatureRow>,
    pub income_forecast: Vec<Forecast>,
    pub expense_forecasts: BTreeMap<ExpenseCategory, Vec<Forecast>>,
    pub shortfall: Vec<ShortfallDay>,
    pub insight: FinancialInsight,
    pub action_cards: Vec<ActionCard>,
}

/// Run the full pipeline in memory: features, forecasts, shortfall, insight
/// and cards, with nothing persisted. `today` anchors the insight snapshot
/// and card validity windows; forecast dates follow the history itself.
pub fn analyze_user(
    transactions: &[Transaction],
    config: &PipelineConfig,
    today: NaiveDate,
) -> Result<UserAnalysis> {
    info!(
        "analyzing {} transactions as of {}",
        transactions.len(),
        today
    );

    let features = features::build_daily_features(transactions, config.winsorize_pct)?;
    if features.is_empty() {
        return Err(CashflowError::InsufficientData {
            stage: "feature_builder".to_string(),
            details: "no transactions in the lookback window".to_string(),
        });
    }

    let income_forecast =
        Forecaster::new(SeriesKind::Income, config.horizon)?.forecast(&features)?;

    let category_series =
        features::build_expense_category_series(transactions, config.winsorize_pct)?;
    let mut expense_forecasts = BTreeMap::new();
    for (category, rows) in &category_series {
        let forecaster = Forecaster::new(SeriesKind::Expense(*category), config.horizon)?;
        expense_forecasts.insert(*category, forecaster.forecast(rows)?);
    }

    let shortfall = shortfall::project_shortfall(&income_forecast, &expense_forecasts)?;
    let insight = insight::analyze(&features, transactions, &shortfall, config, today)?;
    let action_cards = actions::generate_action_cards(&insight, today);

    Ok(UserAnalysis {
        features,
        income_forecast,
        expense_forecasts,
        shortfall,
        insight,
        action_cards,
    })
}

/// Terminal status of a persisted run. Thin histories are a normal outcome,
/// not an error: batch callers skip the user and move on.
#[derive(Debug)]
pub enum RunOutcome {
    Success(Box<UserAnalysis>),
    InsufficientData,
    Error(String),
}

/// Fetch one user's lookback window, analyze it, and persist every artifact.
///
/// Forecast persistence is clean-slate from `today` forward per series;
/// insights and cards append. Failures never propagate as panics or `Err`,
/// they come back as [`RunOutcome::Error`] so a batch over many users
/// survives one bad history.
pub fn run_for_user<S>(
    store: &mut S,
    user_id: &str,
    config: &PipelineConfig,
    today: NaiveDate,
) -> RunOutcome
where
    S: TransactionSource + ForecastSink + InsightSink + ActionCardSink,
{
    if config.lookback_days == 0 {
        return RunOutcome::Error(CashflowError::InvalidLookback(config.lookback_days).to_string());
    }
    let Some(since) = today.checked_sub_days(Days::new(u64::from(config.lookback_days))) else {
        return RunOutcome::Error(format!("lookback window underflows the calendar at {}", today));
    };

    let transactions = match store.fetch(user_id, since, today) {
        Ok(txs) => txs,
        Err(err) => return RunOutcome::Error(err.to_string()),
    };

    let analysis = match analyze_user(&transactions, config, today) {
        Ok(analysis) => analysis,
        Err(err) if err.is_insufficient_data() => {
            info!("user {}: insufficient data, skipping", user_id);
            return RunOutcome::InsufficientData;
        }
        Err(err) => {
            warn!("user {}: analysis failed: {}", user_id, err);
            return RunOutcome::Error(err.to_string());
        }
    };

    let persisted = persist(store, user_id, today, &analysis);
    if let Err(err) = persisted {
        warn!("user {}: persistence failed: {}", user_id, err);
        return RunOutcome::Error(err.to_string());
    }

    RunOutcome::Success(Box::new(analysis))
}

fn persist<S>(store: &mut S, user_id: &str, today: NaiveDate, analysis: &UserAnalysis) -> Result<()>
where
    S: ForecastSink + InsightSink + ActionCardSink,
{
    store.replace_future(
        user_id,
        &SeriesKind::Income.key(),
        today,
        &analysis.income_forecast,
    )?;
    for (category, forecasts) in &analysis.expense_forecasts {
        store.replace_future(
            user_id,
            &SeriesKind::Expense(*category).key(),
            today,
            forecasts,
        )?;
    }
    store.append(user_id, &analysis.insight)?;
    store.append_many(user_id, &analysis.action_cards)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::MemoryStore;

    fn tx(id: &str, date: NaiveDate, amount: f64, balance: Option<f64>) -> Transaction {
        Transaction {
            id: id.to_string(),
            timestamp: date.and_hms_opt(11, 0, 0).unwrap(),
            amount,
            narration: "upi transfer".to_string(),
            category: None,
            balance,
        }
    }

    fn month_of_history(start: NaiveDate) -> Vec<Transaction> {
        (0..30u64)
            .map(|i| {
                let date = start.checked_add_days(Days::new(i)).unwrap();
                let amount = if i % 7 == 0 { 1400.0 } else { -250.0 };
                tx(&format!("t{}", i), date, amount, Some(3000.0 - i as f64 * 10.0))
            })
            .collect()
    }

    #[test]
    fn test_analyze_user_empty_is_insufficient() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let err = analyze_user(&[], &PipelineConfig::default(), today).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_analyze_user_produces_all_artifacts() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let config = PipelineConfig::default();

        let analysis = analyze_user(&month_of_history(start), &config, today).unwrap();

        assert_eq!(analysis.features.len(), 30);
        assert_eq!(analysis.income_forecast.len(), config.horizon);
        assert!(!analysis.expense_forecasts.is_empty());
        for forecasts in analysis.expense_forecasts.values() {
            assert_eq!(forecasts.len(), config.horizon);
        }
        assert_eq!(analysis.shortfall.len(), config.horizon);
        assert_eq!(analysis.insight.analysis_date, today);
    }

    #[test]
    fn test_run_for_user_persists_artifacts() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut store = MemoryStore::new();
        store.add_transactions("u1", month_of_history(start));

        let outcome = run_for_user(&mut store, "u1", &PipelineConfig::default(), today);
        let analysis = match outcome {
            RunOutcome::Success(analysis) => analysis,
            other => panic!("expected success, got {:?}", other),
        };

        assert_eq!(store.forecasts("u1", "income").len(), 14);
        for category in analysis.expense_forecasts.keys() {
            let key = SeriesKind::Expense(*category).key();
            assert_eq!(store.forecasts("u1", &key).len(), 14);
        }
        assert_eq!(store.insights("u1").len(), 1);
        assert_eq!(store.cards("u1").len(), analysis.action_cards.len());
    }

    #[test]
    fn test_run_for_unknown_user_is_insufficient_not_error() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut store = MemoryStore::new();
        let outcome = run_for_user(&mut store, "nobody", &PipelineConfig::default(), today);
        assert!(matches!(outcome, RunOutcome::InsufficientData));
        assert!(store.insights("nobody").is_empty());
    }

    #[test]
    fn test_run_rejects_zero_lookback() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut store = MemoryStore::new();
        let config = PipelineConfig {
            lookback_days: 0,
            ..PipelineConfig::default()
        };
        let outcome = run_for_user(&mut store, "u1", &config, today);
        assert!(matches!(outcome, RunOutcome::Error(_)));
    }

    #[test]
    fn test_transactions_outside_window_are_ignored() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut store = MemoryStore::new();
        // everything is months old, outside the 30-day window
        let stale_start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        store.add_transactions("u1", month_of_history(stale_start));

        let outcome = run_for_user(&mut store, "u1", &PipelineConfig::default(), today);
        assert!(matches!(outcome, RunOutcome::InsufficientData));
    }
}
