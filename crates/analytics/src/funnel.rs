use crate::error::AnalyticsError;
use crate::numeric::{percentage, HUNDRED};
use crate::report::{Exclusion, ExclusionReason};
use chrono::{Duration, NaiveDate};
use core_types::{Record, Stage, Trend};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Default minimum change, in percentage points, before a trend is reported.
pub const DEFAULT_TREND_EPSILON: Decimal = dec!(2);

/// Longest accepted trend window, roughly a century.
pub const MAX_TREND_WINDOW_DAYS: u32 = 36_500;

/// Two back-to-back windows of equal length ending at `as_of`.
///
/// The current window is `(as_of - length, as_of]`, the previous one is the
/// `length` days before it. Records are placed by `occurred_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendWindow {
    pub as_of: NaiveDate,
    pub length_days: u32,
}

impl TrendWindow {
    pub fn new(as_of: NaiveDate, length_days: u32) -> Self {
        Self { as_of, length_days }
    }

    fn slot(&self, date: NaiveDate) -> Option<WindowSlot> {
        let length = Duration::days(i64::from(self.length_days));
        let current_start = self.as_of.checked_sub_signed(length)?;
        let previous_start = current_start.checked_sub_signed(length)?;

        if date > current_start && date <= self.as_of {
            Some(WindowSlot::Current)
        } else if date > previous_start && date <= current_start {
            Some(WindowSlot::Previous)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowSlot {
    Current,
    Previous,
}

/// Validated stage layout for funnel analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct FunnelConfig {
    stage_order: Vec<Stage>,
    trend_epsilon: Decimal,
    trend_window: Option<TrendWindow>,
}

impl FunnelConfig {
    /// Creates a config for the given stage order. Stages must be unique.
    pub fn new(stage_order: Vec<Stage>) -> Result<Self, AnalyticsError> {
        if stage_order.is_empty() {
            return Err(AnalyticsError::Configuration(
                "funnel stage order must not be empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = stage_order.iter().find(|s| !seen.insert(*s)) {
            return Err(AnalyticsError::Configuration(format!(
                "stage '{dup}' appears more than once in the funnel order"
            )));
        }
        Ok(Self {
            stage_order,
            trend_epsilon: DEFAULT_TREND_EPSILON,
            trend_window: None,
        })
    }

    pub fn with_trend_epsilon(mut self, epsilon: Decimal) -> Result<Self, AnalyticsError> {
        if epsilon.is_sign_negative() {
            return Err(AnalyticsError::Configuration(format!(
                "trend epsilon must not be negative, got {epsilon}"
            )));
        }
        self.trend_epsilon = epsilon;
        Ok(self)
    }

    pub fn with_trend_window(self, window: TrendWindow) -> Result<Self, AnalyticsError> {
        validate_window_length(window.length_days)?;
        Ok(self.windowed(window))
    }

    /// Same layout with a different window. The length must already have
    /// passed [`validate_window_length`].
    pub(crate) fn windowed(&self, window: TrendWindow) -> Self {
        Self {
            trend_window: Some(window),
            ..self.clone()
        }
    }

    pub fn stage_order(&self) -> &[Stage] {
        &self.stage_order
    }

    pub fn trend_epsilon(&self) -> Decimal {
        self.trend_epsilon
    }

    pub fn trend_window(&self) -> Option<TrendWindow> {
        self.trend_window
    }
}

/// Rejects trend windows of zero days or longer than [`MAX_TREND_WINDOW_DAYS`].
pub fn validate_window_length(length_days: u32) -> Result<(), AnalyticsError> {
    if length_days == 0 || length_days > MAX_TREND_WINDOW_DAYS {
        return Err(AnalyticsError::Configuration(format!(
            "trend window must be between 1 and {MAX_TREND_WINDOW_DAYS} days, got {length_days}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub stage: Stage,
    pub count: usize,
    pub amount: Decimal,
    /// Percentage of this stage's count reached by the next stage.
    /// `None` for the terminal stage.
    pub conversion_to_next: Option<Decimal>,
    /// Set when this stage is empty and the conversion above is a placeholder `0`.
    pub insufficient_data: bool,
    pub avg_dwell_days: Option<Decimal>,
    pub trend: Trend,
}

/// A stage transition converting below the configured threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineBreak {
    pub from: Stage,
    pub to: Stage,
    pub conversion_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelSummary {
    /// In configured order, independent of input order.
    pub stages: Vec<FunnelStage>,
    pub total_records: usize,
    pub count_excluded: usize,
    pub exclusions: Vec<Exclusion>,
}

impl FunnelSummary {
    /// Transitions whose conversion is strictly below `threshold_pct`.
    ///
    /// Stages flagged `insufficient_data` are skipped.
    pub fn bottlenecks(&self, threshold_pct: Decimal) -> Vec<PipelineBreak> {
        self.stages
            .windows(2)
            .filter(|pair| !pair[0].insufficient_data)
            .filter_map(|pair| {
                let conversion = pair[0].conversion_to_next?;
                (conversion < threshold_pct).then(|| PipelineBreak {
                    from: pair[0].stage.clone(),
                    to: pair[1].stage.clone(),
                    conversion_pct: conversion,
                })
            })
            .collect()
    }

    /// Share of the first stage's count that reached the last stage.
    pub fn overall_conversion_pct(&self) -> Option<Decimal> {
        let first = self.stages.first()?;
        let last = self.stages.last()?;
        conversion_rate(first.count, last.count)
    }

    pub fn stage(&self, stage: &str) -> Option<&FunnelStage> {
        self.stages.iter().find(|s| s.stage.as_str() == stage)
    }
}

#[derive(Default, Clone)]
struct StageAccumulator {
    count: usize,
    amount: Decimal,
    dwell_days_total: i64,
    dwell_samples: usize,
    current_window: usize,
    previous_window: usize,
}

/// Computes stage counts, conversion rates, dwell times and trends.
///
/// Records with no stage, or with a stage outside the configured order, are
/// excluded and counted rather than failing the call.
pub fn analyze_funnel(records: &[Record], config: &FunnelConfig) -> FunnelSummary {
    let index: HashMap<&Stage, usize> = config
        .stage_order
        .iter()
        .enumerate()
        .map(|(i, stage)| (stage, i))
        .collect();

    let mut acc = vec![StageAccumulator::default(); config.stage_order.len()];
    let mut exclusions = Vec::new();
    let mut total_records = 0usize;

    for record in records {
        if let Err(e) = record.validate() {
            tracing::warn!(record_id = %record.id, error = %e, "Skipping invalid record in funnel");
            exclusions.push(Exclusion::new(&record.id, ExclusionReason::Invalid));
            continue;
        }
        let Some(stage) = record.stage.as_ref() else {
            exclusions.push(Exclusion::new(&record.id, ExclusionReason::MissingStage));
            continue;
        };
        let Some(&i) = index.get(stage) else {
            tracing::debug!(record_id = %record.id, %stage, "Stage not in funnel order, excluded");
            exclusions.push(Exclusion::new(&record.id, ExclusionReason::UnknownStage));
            continue;
        };

        let slot = &mut acc[i];
        let Some(amount) = slot.amount.checked_add(record.amount) else {
            tracing::warn!(record_id = %record.id, %stage, "Stage amount would overflow, excluded");
            exclusions.push(Exclusion::new(&record.id, ExclusionReason::Overflow));
            continue;
        };
        slot.count += 1;
        slot.amount = amount;
        total_records += 1;

        // Negative dwell means the timestamps are swapped; leave it out.
        if let Some(days) = record.dwell_days().filter(|d| *d >= 0) {
            slot.dwell_days_total += days;
            slot.dwell_samples += 1;
        }

        match config.trend_window.and_then(|w| w.slot(record.occurred_at)) {
            Some(WindowSlot::Current) => slot.current_window += 1,
            Some(WindowSlot::Previous) => slot.previous_window += 1,
            None => {}
        }
    }

    let last = acc.len() - 1;
    let stages = config
        .stage_order
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            let here = &acc[i];
            let (conversion_to_next, insufficient_data, trend) = if i == last {
                (None, false, Trend::Stable)
            } else {
                let next = &acc[i + 1];
                let trend = trend_between(
                    conversion_rate(here.current_window, next.current_window),
                    conversion_rate(here.previous_window, next.previous_window),
                    config.trend_epsilon,
                );
                match conversion_rate(here.count, next.count) {
                    Some(rate) => (Some(rate), false, trend),
                    None => (Some(Decimal::ZERO), true, trend),
                }
            };

            let avg_dwell_days = (here.dwell_samples > 0).then(|| {
                (Decimal::from(here.dwell_days_total) / Decimal::from(here.dwell_samples)).round_dp(2)
            });

            FunnelStage {
                stage: stage.clone(),
                count: here.count,
                amount: here.amount,
                conversion_to_next,
                insufficient_data,
                avg_dwell_days,
                trend,
            }
        })
        .collect();

    tracing::debug!(
        stages = config.stage_order.len(),
        total_records,
        excluded = exclusions.len(),
        "Funnel analysis complete"
    );

    FunnelSummary {
        stages,
        total_records,
        count_excluded: exclusions.len(),
        exclusions,
    }
}

/// `to / from * 100`, capped at 100 because reopened records can push the
/// next stage above the current one. `None` when `from` is empty.
fn conversion_rate(from: usize, to: usize) -> Option<Decimal> {
    percentage(Decimal::from(to), Decimal::from(from)).map(|rate| rate.min(HUNDRED).round_dp(2))
}

fn trend_between(current: Option<Decimal>, previous: Option<Decimal>, epsilon: Decimal) -> Trend {
    let (Some(current), Some(previous)) = (current, previous) else {
        return Trend::Stable;
    };
    let delta = current - previous;
    if delta > epsilon {
        Trend::Up
    } else if delta < -epsilon {
        Trend::Down
    } else {
        Trend::Stable
    }
}
