use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the analyzers.
///
/// Only programmer mistakes surface here. Bad rows in the input are counted
/// and excluded by the analyzers instead of failing the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration error: stage '{stage}' (record '{record_id}') has no win probability")]
    UnweightedStage { stage: String, record_id: String },

    #[error("Configuration error: dimension weights sum to {0}, expected 1.0")]
    WeightSum(Decimal),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AnalyticsError {
    /// True for every configuration-class error.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, AnalyticsError::Validation(_))
    }
}
