use crate::aging::AgingSummary;
use crate::forecast::ForecastSummary;
use crate::funnel::FunnelSummary;
use crate::health::HealthScore;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why a record was left out of an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// The record failed basic validation (e.g. a negative amount).
    Invalid,
    /// Aging needs a due date to compute days overdue.
    MissingDueDate,
    /// The record is dated after the reference date of the analysis.
    AfterReferenceDate,
    /// Funnel analysis needs a stage.
    MissingStage,
    /// The record's stage is not part of the configured order.
    UnknownStage,
    /// Adding the record would overflow a running total.
    Overflow,
}

/// A record that an analyzer skipped, kept so the caller can surface it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    pub record_id: String,
    pub reason: ExclusionReason,
}

impl Exclusion {
    pub fn new(record_id: &str, reason: ExclusionReason) -> Self {
        Self {
            record_id: record_id.to_string(),
            reason,
        }
    }
}

/// Everything a dashboard page needs from a single snapshot of records.
///
/// This is the final output of `AnalyticsEngine::dashboard` and is meant to be
/// serialised straight to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub reference_date: NaiveDate,
    pub aging: AgingSummary,
    pub funnel: FunnelSummary,
    pub forecast: ForecastSummary,
    /// The raw metrics the health score was computed from.
    pub metrics: BTreeMap<String, Decimal>,
    pub health: HealthScore,
}

impl DashboardReport {
    /// Total number of records skipped across aging and funnel analysis.
    pub fn excluded_records(&self) -> usize {
        self.aging.count_excluded + self.funnel.count_excluded
    }
}
