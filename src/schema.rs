use chrono::{NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed expense taxonomy. Transactions that the upstream classifier leaves
/// unresolved are bucketed by the keyword fallback in [`crate::categorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Fuel,
    Food,
    Shopping,
    Travel,
    Phone,
    Rent,
    Cash,
    Misc,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 8] = [
        ExpenseCategory::Fuel,
        ExpenseCategory::Food,
        ExpenseCategory::Shopping,
        ExpenseCategory::Travel,
        ExpenseCategory::Phone,
        ExpenseCategory::Rent,
        ExpenseCategory::Cash,
        ExpenseCategory::Misc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Fuel => "fuel",
            ExpenseCategory::Food => "food",
            ExpenseCategory::Shopping => "shopping",
            ExpenseCategory::Travel => "travel",
            ExpenseCategory::Phone => "phone",
            ExpenseCategory::Rent => "rent",
            ExpenseCategory::Cash => "cash",
            ExpenseCategory::Misc => "misc",
        }
    }

    /// Categories that count as discretionary for impulse/unnecessary
    /// spending analysis.
    pub fn is_discretionary(&self) -> bool {
        matches!(self, ExpenseCategory::Shopping | ExpenseCategory::Misc)
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fuel" => Ok(ExpenseCategory::Fuel),
            "food" => Ok(ExpenseCategory::Food),
            "shopping" => Ok(ExpenseCategory::Shopping),
            "travel" => Ok(ExpenseCategory::Travel),
            "phone" => Ok(ExpenseCategory::Phone),
            "rent" => Ok(ExpenseCategory::Rent),
            "cash" => Ok(ExpenseCategory::Cash),
            "misc" => Ok(ExpenseCategory::Misc),
            _ => Err(format!("Unknown expense category: {}", s)),
        }
    }
}

/// A single classified transaction. Source of truth; the pipeline only reads
/// these, it never mutates or re-derives them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    pub id: String,

    #[schemars(description = "Transaction time; the hour feeds time-of-day spending analysis")]
    pub timestamp: NaiveDateTime,

    #[schemars(description = "Signed amount: positive = income, negative = expense")]
    pub amount: f64,

    #[schemars(description = "Raw narration text; used by the keyword fallback classifier")]
    pub narration: String,

    #[schemars(description = "Category resolved by the upstream classifier, if any")]
    pub category: Option<ExpenseCategory>,

    #[schemars(description = "Running account balance after the transaction, if known")]
    pub balance: Option<f64>,
}

impl Transaction {
    pub fn is_income(&self) -> bool {
        self.amount > 0.0
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Absolute monetary magnitude regardless of direction.
    pub fn magnitude(&self) -> f64 {
        self.amount.abs()
    }
}

/// One engineered row per calendar date. Dates within a built series are
/// strictly increasing and gap-free; zero-activity days are synthesized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DailyFeatureRow {
    pub date: NaiveDate,

    #[schemars(description = "Winsorized signed daily net (income minus expense)")]
    pub net_amount: f64,

    pub tx_count: u32,
    pub total_income: f64,
    pub total_expense: f64,
    pub closing_balance: Option<f64>,

    pub rolling_7_mean: f64,
    pub rolling_30_mean: f64,
    pub rolling_7_std: f64,
    pub rolling_30_std: f64,
    pub prev_day_net: f64,
    pub lag7_mean: f64,

    #[schemars(description = "Day of week, Monday = 0")]
    pub day_of_week: u32,
    pub is_weekend: bool,
    pub month: u32,
    pub is_month_end: bool,
}

/// Which series a forecast belongs to. The kind fixes the MAPE stability
/// threshold and the two confidence tiers attached to forecast rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "series", content = "category")]
pub enum SeriesKind {
    Income,
    Expense(ExpenseCategory),
}

impl SeriesKind {
    /// In-sample MAPE (%) above which the model is judged unstable.
    pub fn mape_threshold(&self) -> f64 {
        match self {
            SeriesKind::Income => 25.0,
            SeriesKind::Expense(_) => 30.0,
        }
    }

    /// Two-tier confidence: stable models get the upper tier, everything
    /// else (including undefined MAPE) the lower.
    pub fn confidence(&self, stable: bool) -> f64 {
        match (self, stable) {
            (SeriesKind::Income, true) => 0.9,
            (SeriesKind::Income, false) => 0.7,
            (SeriesKind::Expense(_), true) => 0.8,
            (SeriesKind::Expense(_), false) => 0.6,
        }
    }

    pub fn key(&self) -> String {
        match self {
            SeriesKind::Income => "income".to_string(),
            SeriesKind::Expense(cat) => format!("expense:{}", cat),
        }
    }
}

/// One forecast day for one (user, series) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Forecast {
    pub date: NaiveDate,
    pub predicted_amount: f64,

    #[schemars(description = "Model tag shared by every row of a run")]
    pub model: String,

    pub model_confidence: f64,

    #[schemars(description = "In-sample MAPE (%); NaN when the metric is undefined")]
    pub mape: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One projected day of net cash position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ShortfallDay {
    pub date: NaiveDate,
    pub predicted_income: f64,
    pub predicted_expense: f64,
    pub predicted_net: f64,
    pub is_deficit: bool,

    #[schemars(description = "Binary at this stage: high on deficit days, low otherwise")]
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IncomeStability {
    Stable,
    Moderate,
    Volatile,
    Unknown,
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStability {
    Consistent,
    Variable,
    Erratic,
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SavingsConsistency {
    Always,
    Often,
    Sometimes,
    Rarely,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SpendingPattern {
    Impulsive,
    Moderate,
    Controlled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PeakTime {
    Morning,
    Afternoon,
    Evening,
}

/// Wide per-run snapshot of descriptive statistics, risk score and
/// recommendations. Append-only: each pipeline run produces a fresh one.
///
/// Field names serialize in camelCase to match the wire records the rest of
/// the product consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinancialInsight {
    pub analysis_date: NaiveDate,
    pub analysis_period_days: u32,

    // Income
    pub avg_daily_income: f64,
    pub income_stability: IncomeStability,
    pub income_stability_score: f64,
    pub income_growth_rate: f64,
    pub lowest_income_week: f64,
    pub highest_income_week: f64,
    pub weekend_income_boost: f64,

    // Expense
    pub avg_daily_expense: f64,
    pub expense_stability: ExpenseStability,
    pub top_expense_category: Option<ExpenseCategory>,
    pub top_expense_category_amount: f64,
    pub top_expense_category_percent: f64,
    pub unnecessary_spending_amount: f64,

    // Savings
    pub avg_daily_savings: f64,
    pub savings_rate: f64,
    pub total_savings_last30_days: f64,
    pub savings_consistency: SavingsConsistency,
    pub days_with_zero_savings: u32,

    // Cashflow health
    pub avg_daily_balance: f64,
    pub lowest_balance: f64,
    pub lowest_balance_date: Option<NaiveDate>,
    pub days_with_negative_cashflow: u32,
    pub days_with_low_balance: u32,
    pub cash_crunch_risk: RiskLevel,

    // Behavior
    pub impulsive_purchases: u32,
    pub spending_pattern_type: SpendingPattern,
    pub average_transaction_size: f64,
    pub high_value_transactions: u32,
    pub spending_peak_day: String,
    pub spending_peak_time: PeakTime,

    // Forecast risk
    pub predicted_shortfall_days: u32,
    pub predicted_shortfall_amount: f64,
    pub next_low_balance_date: Option<NaiveDate>,

    // Score
    pub overall_risk_level: RiskLevel,
    pub risk_score: f64,
    pub risk_factors: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,

    // Recommendations
    pub recommended_daily_savings: f64,
    pub recommended_emergency_fund: f64,
    pub months_to_emergency_fund: f64,

    pub financial_health_grade: String,
    pub insights_summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    EmergencyAlert,
    SaveNow,
    ReduceExpense,
    DelayPurchase,
    MilestoneAchieved,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::EmergencyAlert => "emergency_alert",
            CardType::SaveNow => "save_now",
            CardType::ReduceExpense => "reduce_expense",
            CardType::DelayPurchase => "delay_purchase",
            CardType::MilestoneAchieved => "milestone_achieved",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Numeric rank for sorting; higher fires first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Urgent => 4,
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

/// A single time-boxed, user-facing recommendation derived from one insight
/// snapshot. Write-once per run; expires at `valid_until`. Deduplication
/// against previously delivered cards is the delivery layer's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionCard {
    pub card_type: CardType,
    pub priority: Priority,
    pub category: String,

    pub title: String,
    pub message: String,
    pub message_hindi: Option<String>,
    pub icon: String,
    pub color: String,

    pub action_type: String,
    pub action_amount: Option<f64>,
    pub action_category: Option<ExpenseCategory>,
    pub action_description: Option<String>,

    pub expected_savings: Option<f64>,
    pub expected_impact_days: Option<u32>,
    pub impact_description: Option<String>,

    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub is_urgent: bool,
    pub days_until_impact: Option<u32>,
}

/// Tunable knobs for one pipeline run. Defaults mirror the production
/// configuration the thresholds were tuned against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PipelineConfig {
    #[serde(default = "default_lookback_days")]
    #[schemars(description = "Historical window in days fed to the feature builder (30-90)")]
    pub lookback_days: u32,

    #[serde(default = "default_horizon")]
    #[schemars(description = "Forecast horizon in days")]
    pub horizon: usize,

    #[serde(default = "default_winsorize_pct")]
    #[schemars(description = "Upper winsorization percentile; the lower bound is its mirror")]
    pub winsorize_pct: f64,

    #[serde(default = "default_low_balance_threshold")]
    pub low_balance_threshold: f64,

    #[serde(default = "default_high_value_threshold")]
    #[schemars(description = "Transaction size above which a discretionary purchase counts as impulsive")]
    pub high_value_threshold: f64,

    #[serde(default = "default_savings_floor")]
    #[schemars(description = "Minimum recommended daily savings amount")]
    pub savings_floor: f64,
}

fn default_lookback_days() -> u32 {
    30
}

fn default_horizon() -> usize {
    14
}

fn default_winsorize_pct() -> f64 {
    0.99
}

fn default_low_balance_threshold() -> f64 {
    500.0
}

fn default_high_value_threshold() -> f64 {
    1000.0
}

fn default_savings_floor() -> f64 {
    50.0
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            horizon: default_horizon(),
            winsorize_pct: default_winsorize_pct(),
            low_balance_threshold: default_low_balance_threshold(),
            high_value_threshold: default_high_value_threshold(),
            savings_floor: default_savings_floor(),
        }
    }
}

impl PipelineConfig {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PipelineConfig)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
