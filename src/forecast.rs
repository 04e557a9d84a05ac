//! Forecaster: trains a gradient-boosted regression ensemble per series and
//! produces an N-day-ahead forecast via one-step recursive rollout.
//!
//! The rollout feeds each prediction back in as the next day's features.
//! Rolling statistics are advanced with an incremental-mean update rather
//! than exact window recomputation; that drift is an accepted property the
//! MAPE stability thresholds were tuned against, so it must not be replaced
//! with exact recomputation without re-validating those thresholds.

use crate::error::{CashflowError, Result};
use crate::schema::{DailyFeatureRow, Forecast, SeriesKind};
use chrono::{Datelike, Days, NaiveDate};
use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use log::{debug, info};

pub const MODEL_TAG: &str = "gbdt";

const GUARD_EPSILON: f64 = 1e-8;

/// In-sample accuracy metrics. MAPE is NaN when the truth is ~0 everywhere,
/// in which case only RMSE is meaningful.
pub fn evaluate(y_true: &[f64], y_pred: &[f64]) -> (f64, f64) {
    let n = y_true.len() as f64;
    let rmse = (y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p) * (t - p))
        .sum::<f64>()
        / n)
        .sqrt();

    if y_true.iter().all(|t| t.abs() <= GUARD_EPSILON) {
        return (f64::NAN, rmse);
    }

    let mape = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| {
            let denom = if t.abs() < GUARD_EPSILON {
                GUARD_EPSILON
            } else {
                *t
            };
            ((t - p) / denom).abs()
        })
        .sum::<f64>()
        / n
        * 100.0;

    (mape, rmse)
}

/// Carried state of the recursive rollout. `advance` is the fold step:
/// `state_{i+1} = state_i.advance(prediction_i)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutState {
    pub date: NaiveDate,
    pub prev_day_net: f64,
    pub lag7_mean: f64,
    pub rolling_7_mean: f64,
    pub rolling_30_mean: f64,
    pub rolling_7_std: f64,
    pub rolling_30_std: f64,
    pub tx_count: f64,
}

impl RolloutState {
    pub fn from_row(row: &DailyFeatureRow) -> Self {
        Self {
            date: row.date,
            prev_day_net: row.prev_day_net,
            lag7_mean: row.lag7_mean,
            rolling_7_mean: row.rolling_7_mean,
            rolling_30_mean: row.rolling_30_mean,
            rolling_7_std: row.rolling_7_std,
            rolling_30_std: row.rolling_30_std,
            tx_count: row.tx_count as f64,
        }
    }

    /// Synthesize the next day's feature row from a prediction. Calendar
    /// fields are exact; rolling means use the incremental approximation;
    /// stds and tx_count are carried unchanged.
    pub fn advance(&self, prediction: f64) -> Self {
        let next_date = self
            .date
            .checked_add_days(Days::new(1))
            .unwrap_or(self.date);
        Self {
            date: next_date,
            prev_day_net: prediction,
            lag7_mean: (self.lag7_mean * 6.0 + prediction) / 7.0,
            rolling_7_mean: (self.rolling_7_mean * 6.0 + prediction) / 7.0,
            rolling_30_mean: (self.rolling_30_mean * 29.0 + prediction) / 30.0,
            rolling_7_std: self.rolling_7_std,
            rolling_30_std: self.rolling_30_std,
            tx_count: self.tx_count,
        }
    }

    fn feature_vector(&self) -> Vec<f32> {
        feature_vector(
            self.prev_day_net,
            self.lag7_mean,
            self.rolling_7_mean,
            self.rolling_30_mean,
            self.rolling_7_std,
            self.rolling_30_std,
            self.date,
            self.tx_count,
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn feature_vector(
    prev_day_net: f64,
    lag7_mean: f64,
    rolling_7_mean: f64,
    rolling_30_mean: f64,
    rolling_7_std: f64,
    rolling_30_std: f64,
    date: NaiveDate,
    tx_count: f64,
) -> Vec<f32> {
    let dow = crate::utils::day_of_week_index(date);
    vec![
        prev_day_net as f32,
        lag7_mean as f32,
        rolling_7_mean as f32,
        rolling_30_mean as f32,
        rolling_7_std as f32,
        rolling_30_std as f32,
        dow as f32,
        if dow >= 5 { 1.0 } else { 0.0 },
        date.month() as f32,
        if crate::utils::is_month_end(date) { 1.0 } else { 0.0 },
        tx_count as f32,
    ]
}

fn row_features(row: &DailyFeatureRow) -> Vec<f32> {
    feature_vector(
        row.prev_day_net,
        row.lag7_mean,
        row.rolling_7_mean,
        row.rolling_30_mean,
        row.rolling_7_std,
        row.rolling_30_std,
        row.date,
        row.tx_count as f64,
    )
}

const FEATURE_COUNT: usize = 11;

pub struct Forecaster {
    kind: SeriesKind,
    horizon: usize,
}

impl Forecaster {
    pub fn new(kind: SeriesKind, horizon: usize) -> Result<Self> {
        if horizon == 0 {
            return Err(CashflowError::InvalidHorizon(horizon));
        }
        Ok(Self { kind, horizon })
    }

    /// Produce exactly `horizon` forecast rows from a feature series.
    ///
    /// Never fails for thin data: a one-row history falls back to a naive
    /// repeat-last-value forecast with undefined MAPE and the low confidence
    /// tier, so downstream stages can always proceed.
    pub fn forecast(&self, rows: &[DailyFeatureRow]) -> Result<Vec<Forecast>> {
        let last = rows.last().ok_or_else(|| CashflowError::InsufficientData {
            stage: "forecaster".to_string(),
            details: format!("no feature rows for series {}", self.kind.key()),
        })?;

        // Supervised frame: row t's label is day t+1's net. The last row has
        // no label and is dropped.
        if rows.len() < 2 {
            debug!(
                "series {}: single-row history, using naive fallback",
                self.kind.key()
            );
            return Ok(self.naive(last));
        }

        let mut train: DataVec = rows
            .windows(2)
            .map(|pair| {
                Data::new_training_data(row_features(&pair[0]), 1.0, pair[1].net_amount as f32, None)
            })
            .collect();

        let model = self.fit(&mut train)?;

        let eval_data: DataVec = rows
            .windows(2)
            .map(|pair| Data::new_test_data(row_features(&pair[0]), None))
            .collect();
        let in_sample = model.predict(&eval_data);
        let y_true: Vec<f64> = rows[1..].iter().map(|r| r.net_amount).collect();
        let y_pred: Vec<f64> = in_sample.iter().map(|p| *p as f64).collect();
        let (mape, rmse) = evaluate(&y_true, &y_pred);

        let stable = mape.is_finite() && mape <= self.kind.mape_threshold();
        let confidence = self.kind.confidence(stable);
        info!(
            "series {}: mape={:.2}% rmse={:.2} stable={}",
            self.kind.key(),
            mape,
            rmse,
            stable
        );

        // Recursive rollout as an explicit fold over the last known row.
        let mut state = RolloutState::from_row(last);
        let mut forecasts = Vec::with_capacity(self.horizon);
        for _ in 0..self.horizon {
            let query: DataVec = vec![Data::new_test_data(state.feature_vector(), None)];
            let prediction = model.predict(&query)[0] as f64;
            state = state.advance(prediction);
            forecasts.push(Forecast {
                date: state.date,
                predicted_amount: prediction,
                model: MODEL_TAG.to_string(),
                model_confidence: confidence,
                mape,
            });
        }

        Ok(forecasts)
    }

    fn fit(&self, train: &mut DataVec) -> Result<GBDT> {
        let mut config = Config::new();
        config.set_feature_size(FEATURE_COUNT);
        config.set_max_depth(4);
        config.set_iterations(self.iterations());
        config.set_shrinkage(0.1);
        config.set_loss("SquareLoss");
        // Full sampling keeps the fit deterministic, which the pipeline's
        // idempotence contract depends on.
        config.set_data_sample_ratio(1.0);
        config.set_feature_sample_ratio(1.0);
        config.set_training_optimization_level(2);

        let mut model = GBDT::new(&config);
        model.fit(train);
        Ok(model)
    }

    fn iterations(&self) -> usize {
        match self.kind {
            SeriesKind::Income => 500,
            SeriesKind::Expense(_) => 400,
        }
    }

    fn naive(&self, last: &DailyFeatureRow) -> Vec<Forecast> {
        let confidence = self.kind.confidence(false);
        let mut date = last.date;
        (0..self.horizon)
            .map(|_| {
                date = date.checked_add_days(Days::new(1)).unwrap_or(date);
                Forecast {
                    date,
                    predicted_amount: last.net_amount,
                    model: MODEL_TAG.to_string(),
                    model_confidence: confidence,
                    mape: f64::NAN,
                }
            })
            .collect()
    }
}
