//! Storage seams between the pipeline and whatever holds its data.
//!
//! The pipeline is pure with respect to persistence: it reads transactions
//! through [`TransactionSource`] and writes artifacts through the sink
//! traits. [`MemoryStore`] implements all of them over plain maps, which is
//! enough for tests and single-process embedding.

use crate::error::Result;
use crate::schema::{ActionCard, FinancialInsight, Forecast, Transaction};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Read side: classified transactions for one user in a half-open date
/// window `[since, until)`.
pub trait TransactionSource {
    fn fetch(&self, user_id: &str, since: NaiveDate, until: NaiveDate)
        -> Result<Vec<Transaction>>;
}

/// Forecast persistence. A re-run must leave exactly one forecast per
/// (user, series, date) for dates from `today` on, while rows before
/// `today` stay untouched as the historical record.
pub trait ForecastSink {
    fn replace_future(
        &mut self,
        user_id: &str,
        series_key: &str,
        today: NaiveDate,
        forecasts: &[Forecast],
    ) -> Result<()>;
}

/// Insight snapshots are append-only; each run adds one.
pub trait InsightSink {
    fn append(&mut self, user_id: &str, insight: &FinancialInsight) -> Result<()>;
}

/// Action cards are append-only; expiry is driven by `valid_until`, not
/// deletion.
pub trait ActionCardSink {
    fn append_many(&mut self, user_id: &str, cards: &[ActionCard]) -> Result<()>;
}

/// In-memory implementation of every storage seam.
#[derive(Debug, Default)]
pub struct MemoryStore {
    transactions: BTreeMap<String, Vec<Transaction>>,
    forecasts: BTreeMap<(String, String), Vec<Forecast>>,
    insights: BTreeMap<String, Vec<FinancialInsight>>,
    cards: BTreeMap<String, Vec<ActionCard>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transactions(&mut self, user_id: &str, transactions: Vec<Transaction>) {
        self.transactions
            .entry(user_id.to_string())
            .or_default()
            .extend(transactions);
    }

    pub fn forecasts(&self, user_id: &str, series_key: &str) -> &[Forecast] {
        self.forecasts
            .get(&(user_id.to_string(), series_key.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn insights(&self, user_id: &str) -> &[FinancialInsight] {
        self.insights
            .get(user_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn cards(&self, user_id: &str) -> &[ActionCard] {
        self.cards.get(user_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl TransactionSource for MemoryStore {
    fn fetch(
        &self,
        user_id: &str,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        Ok(self
            .transactions
            .get(user_id)
            .map(|txs| {
                txs.iter()
                    .filter(|t| t.date() >= since && t.date() < until)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl ForecastSink for MemoryStore {
    fn replace_future(
        &mut self,
        user_id: &str,
        series_key: &str,
        today: NaiveDate,
        forecasts: &[Forecast],
    ) -> Result<()> {
        let rows = self
            .forecasts
            .entry((user_id.to_string(), series_key.to_string()))
            .or_default();
        rows.retain(|f| f.date < today);
        rows.extend_from_slice(forecasts);
        rows.sort_by_key(|f| f.date);
        Ok(())
    }
}

impl InsightSink for MemoryStore {
    fn append(&mut self, user_id: &str, insight: &FinancialInsight) -> Result<()> {
        self.insights
            .entry(user_id.to_string())
            .or_default()
            .push(insight.clone());
        Ok(())
    }
}

impl ActionCardSink for MemoryStore {
    fn append_many(&mut self, user_id: &str, cards: &[ActionCard]) -> Result<()> {
        self.cards
            .entry(user_id.to_string())
            .or_default()
            .extend_from_slice(cards);
        Ok(())
    }
}
