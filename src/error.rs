use thiserror::Error;

#[derive(Error, Debug)]
pub enum CashflowError {
    #[error("Insufficient data in {stage}: {details}")]
    InsufficientData { stage: String, details: String },

    #[error("No income forecast available; shortfall projection cannot run")]
    MissingIncomeForecast,

    #[error("Invalid forecast horizon {0}: must be at least 1 day")]
    InvalidHorizon(usize),

    #[error("Invalid winsorization percentile {0}: must be between 0.5 and 1.0")]
    InvalidPercentile(f64),

    #[error("Invalid lookback window {0}: must be at least 1 day")]
    InvalidLookback(u32),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CashflowError>;

impl CashflowError {
    /// Whether this failure means "skip the user, don't abort the batch".
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            CashflowError::InsufficientData { .. } | CashflowError::MissingIncomeForecast
        )
    }
}
