use crate::error::AnalyticsError;
use crate::numeric::Magnitude;
use core_types::{Record, Stage};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Confidence reported when the caller does not supply one.
///
/// This is a fixed constant, not derived from sample size.
pub const DEFAULT_CONFIDENCE_LEVEL: Decimal = dec!(0.80);

/// Win-probability table keyed by stage, in caller order.
#[derive(Debug, Clone, PartialEq)]
pub struct StageWeights {
    weights: Vec<(Stage, Decimal)>,
    index: HashMap<Stage, usize>,
    confidence_level: Decimal,
}

impl StageWeights {
    /// Validates that each probability lies in `[0, 1]` and no stage repeats.
    pub fn new(weights: Vec<(Stage, Decimal)>) -> Result<Self, AnalyticsError> {
        let mut index = HashMap::with_capacity(weights.len());
        for (i, (stage, probability)) in weights.iter().enumerate() {
            if *probability < Decimal::ZERO || *probability > Decimal::ONE {
                return Err(AnalyticsError::Configuration(format!(
                    "win probability for stage '{stage}' must be between 0 and 1, got {probability}"
                )));
            }
            if index.insert(stage.clone(), i).is_some() {
                return Err(AnalyticsError::Configuration(format!(
                    "stage '{stage}' appears more than once in the weight table"
                )));
            }
        }
        Ok(Self {
            weights,
            index,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
        })
    }

    pub fn with_confidence_level(mut self, level: Decimal) -> Result<Self, AnalyticsError> {
        if level < Decimal::ZERO || level > Decimal::ONE {
            return Err(AnalyticsError::Configuration(format!(
                "confidence level must be between 0 and 1, got {level}"
            )));
        }
        self.confidence_level = level;
        Ok(self)
    }

    pub fn probability(&self, stage: &Stage) -> Option<Decimal> {
        self.index.get(stage).map(|&i| self.weights[i].1)
    }

    pub fn confidence_level(&self) -> Decimal {
        self.confidence_level
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageForecast {
    pub stage: Stage,
    pub record_count: usize,
    pub raw_amount: Decimal,
    pub win_probability: Decimal,
    /// Always `raw_amount * win_probability`.
    pub weighted_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    /// Sum of every stage's `weighted_amount`.
    pub predicted_total: Decimal,
    pub confidence_level: Decimal,
    /// Unweighted value of the open pipeline.
    pub pipeline_total: Decimal,
    /// Order of magnitude of `pipeline_total`.
    pub amount_magnitude: Magnitude,
    pub open_records: usize,
    /// One row per weighted stage, in weight-table order.
    pub per_stage: Vec<StageForecast>,
}

/// Projects revenue from the open pipeline.
///
/// Closed records (`won`, `lost`, ...) are ignored. An open record whose stage
/// has no weight fails the whole call with `UnweightedStage`, and amounts too
/// large to total fail it with `Validation`.
pub fn forecast(
    records: &[Record],
    weights: &StageWeights,
) -> Result<ForecastSummary, AnalyticsError> {
    let mut raw = vec![(0usize, Decimal::ZERO); weights.len()];
    let mut open_records = 0usize;

    for record in records.iter().filter(|r| !r.status.is_terminal()) {
        let i = record
            .stage
            .as_ref()
            .and_then(|stage| weights.index.get(stage).copied())
            .ok_or_else(|| AnalyticsError::UnweightedStage {
                stage: record
                    .stage
                    .as_ref()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "<none>".to_string()),
                record_id: record.id.clone(),
            })?;

        raw[i].1 = raw[i].1.checked_add(record.amount).ok_or_else(|| {
            AnalyticsError::Validation(format!(
                "record '{}' overflows the pipeline total of stage '{}'",
                record.id, weights.weights[i].0
            ))
        })?;
        raw[i].0 += 1;
        open_records += 1;
    }

    let per_stage = weights
        .weights
        .iter()
        .zip(raw)
        .map(|((stage, probability), (record_count, raw_amount))| {
            let weighted_amount = raw_amount.checked_mul(*probability).ok_or_else(|| {
                AnalyticsError::Validation(format!("weighted amount of stage '{stage}' overflows"))
            })?;
            Ok(StageForecast {
                stage: stage.clone(),
                record_count,
                raw_amount,
                win_probability: *probability,
                weighted_amount,
            })
        })
        .collect::<Result<Vec<_>, AnalyticsError>>()?;

    let predicted_total = checked_total(per_stage.iter().map(|s| s.weighted_amount), "weighted")?;
    let pipeline_total = checked_total(per_stage.iter().map(|s| s.raw_amount), "pipeline")?;

    tracing::debug!(open_records, %predicted_total, "Forecast complete");

    Ok(ForecastSummary {
        predicted_total,
        confidence_level: weights.confidence_level,
        pipeline_total,
        amount_magnitude: Magnitude::of(pipeline_total),
        open_records,
        per_stage,
    })
}

fn checked_total(
    mut amounts: impl Iterator<Item = Decimal>,
    label: &str,
) -> Result<Decimal, AnalyticsError> {
    amounts
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
        .ok_or_else(|| AnalyticsError::Validation(format!("{label} forecast total overflows")))
}
