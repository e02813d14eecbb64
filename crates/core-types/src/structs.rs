use crate::enums::RecordStatus;
use crate::error::CoreError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A discrete position in a multi-step pipeline.
///
/// Stage names are configuration rather than a closed set, so this is a thin
/// wrapper around the name the backend reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stage(String);

impl Stage {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Stage {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Stage {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// The generic transactional unit consumed by every analyzer.
///
/// An invoice, a purchase order and a sales opportunity all map onto this
/// shape. Records are owned by the caller and only ever borrowed by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub amount: Decimal,
    /// Portion of `amount` already settled. Only relevant for receivables.
    #[serde(default)]
    pub paid_amount: Decimal,
    pub occurred_at: NaiveDate,
    #[serde(default)]
    pub due_at: Option<NaiveDate>,
    #[serde(default)]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub stage_entered_at: Option<NaiveDate>,
    #[serde(default)]
    pub stage_exited_at: Option<NaiveDate>,
}

impl Record {
    /// Creates an open record with no due date, stage or payments.
    pub fn new(id: impl Into<String>, amount: Decimal, occurred_at: NaiveDate) -> Self {
        Self {
            id: id.into(),
            amount,
            paid_amount: Decimal::ZERO,
            occurred_at,
            due_at: None,
            stage: None,
            status: RecordStatus::Open,
            stage_entered_at: None,
            stage_exited_at: None,
        }
    }

    pub fn with_due(mut self, due_at: NaiveDate) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn with_stage(mut self, stage: impl Into<Stage>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_paid(mut self, paid_amount: Decimal) -> Self {
        self.paid_amount = paid_amount;
        self
    }

    pub fn with_dwell(mut self, entered: NaiveDate, exited: NaiveDate) -> Self {
        self.stage_entered_at = Some(entered);
        self.stage_exited_at = Some(exited);
        self
    }

    /// The outstanding balance, never negative.
    pub fn unpaid_amount(&self) -> Decimal {
        (self.amount - self.paid_amount).max(Decimal::ZERO)
    }

    /// Days spent in the current stage, when both timestamps are known.
    pub fn dwell_days(&self) -> Option<i64> {
        match (self.stage_entered_at, self.stage_exited_at) {
            (Some(entered), Some(exited)) => Some((exited - entered).num_days()),
            _ => None,
        }
    }

    /// Checks the record for values no backend should ever produce.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.trim().is_empty() {
            return Err(CoreError::MissingId(self.id.clone()));
        }
        for (field, value) in [("amount", self.amount), ("paid_amount", self.paid_amount)] {
            if value.is_sign_negative() {
                return Err(CoreError::NegativeAmount {
                    record_id: self.id.clone(),
                    field,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}
