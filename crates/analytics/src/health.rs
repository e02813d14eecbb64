//! Composite health/risk scoring.
//!
//! A [`Scorecard`] holds the dimension layout: a name, a weight and a
//! normaliser mapping the raw metric onto `0..=100`. Weights are checked once
//! when the scorecard is built, so scoring itself can only fail on missing
//! inputs.

use crate::error::AnalyticsError;
use crate::numeric::{approx_eq, clamp_score, round_score, HUNDRED};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Allowed distance between the weight total and 1.0.
pub const WEIGHT_TOLERANCE: Decimal = dec!(0.001);

/// Maps a raw metric onto the 0-100 score axis.
///
/// Results outside `0..=100` are clamped by the scorecard.
pub trait Normalize: Send + Sync {
    fn normalize(&self, raw: Decimal) -> Decimal;

    /// Rejects parameter combinations that cannot produce a score.
    fn validate(&self) -> Result<(), AnalyticsError> {
        Ok(())
    }
}

impl<F> Normalize for F
where
    F: Fn(Decimal) -> Decimal + Send + Sync,
{
    fn normalize(&self, raw: Decimal) -> Decimal {
        self(raw)
    }
}

/// The built-in normalisers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Normalizer {
    /// Higher is better. `floor` maps to 0 and `ceiling` to 100.
    Linear { floor: Decimal, ceiling: Decimal },
    /// Lower is better. At or below `target` scores 100, at or above `limit` scores 0.
    InverseThreshold { target: Decimal, limit: Decimal },
    /// The raw value is already a percentage.
    Percentage,
}

impl Normalize for Normalizer {
    fn normalize(&self, raw: Decimal) -> Decimal {
        match *self {
            Normalizer::Linear { floor, ceiling } => {
                if ceiling <= floor {
                    return if raw >= ceiling { HUNDRED } else { Decimal::ZERO };
                }
                clamp_score((raw - floor) / (ceiling - floor) * HUNDRED)
            }
            Normalizer::InverseThreshold { target, limit } => {
                if raw <= target {
                    HUNDRED
                } else if raw >= limit {
                    Decimal::ZERO
                } else {
                    (limit - raw) / (limit - target) * HUNDRED
                }
            }
            Normalizer::Percentage => clamp_score(raw),
        }
    }

    fn validate(&self) -> Result<(), AnalyticsError> {
        match *self {
            Normalizer::Linear { floor, ceiling } if floor >= ceiling => {
                Err(AnalyticsError::Configuration(format!(
                    "linear normalizer needs floor < ceiling, got {floor} and {ceiling}"
                )))
            }
            Normalizer::InverseThreshold { target, limit } if target >= limit => {
                Err(AnalyticsError::Configuration(format!(
                    "inverse threshold normalizer needs target < limit, got {target} and {limit}"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Qualitative label for an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Critical,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl Tier {
    /// Lower edges are inclusive: exactly 75 is `Good`, anything below is `Fair`.
    pub fn from_score(score: Decimal) -> Self {
        if score >= dec!(90) {
            Tier::Excellent
        } else if score >= dec!(75) {
            Tier::Good
        } else if score >= dec!(60) {
            Tier::Fair
        } else if score >= dec!(45) {
            Tier::Poor
        } else {
            Tier::Critical
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tier::Excellent => "excellent",
            Tier::Good => "good",
            Tier::Fair => "fair",
            Tier::Poor => "poor",
            Tier::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// Layout of one scored dimension.
pub struct DimensionSpec {
    pub name: String,
    pub weight: Decimal,
    pub normalizer: Box<dyn Normalize>,
}

impl DimensionSpec {
    pub fn new(
        name: impl Into<String>,
        weight: Decimal,
        normalizer: impl Normalize + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            weight,
            normalizer: Box::new(normalizer),
        }
    }
}

impl fmt::Debug for DimensionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DimensionSpec")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// A raw metric value supplied at scoring time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionInput {
    pub name: String,
    pub raw_value: Decimal,
}

impl DimensionInput {
    pub fn new(name: impl Into<String>, raw_value: Decimal) -> Self {
        Self {
            name: name.into(),
            raw_value,
        }
    }
}

/// A dimension carrying its own value, for one-shot scoring via [`score`].
pub struct Dimension {
    pub name: String,
    pub raw_value: Decimal,
    pub normalizer: Box<dyn Normalize>,
    pub weight: Decimal,
}

impl Dimension {
    pub fn new(
        name: impl Into<String>,
        raw_value: Decimal,
        normalizer: impl Normalize + 'static,
        weight: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            raw_value,
            normalizer: Box::new(normalizer),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub name: String,
    pub raw_value: Decimal,
    /// Normalised and clamped to `0..=100`.
    pub score: Decimal,
    pub weight: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub overall_score: u8,
    pub tier: Tier,
    pub dimensions: Vec<DimensionScore>,
}

/// A validated set of weighted dimensions.
#[derive(Debug)]
pub struct Scorecard {
    dimensions: Vec<DimensionSpec>,
}

impl Scorecard {
    pub fn new(dimensions: Vec<DimensionSpec>) -> Result<Self, AnalyticsError> {
        if dimensions.is_empty() {
            return Err(AnalyticsError::Configuration(
                "a scorecard needs at least one dimension".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for dimension in &dimensions {
            if !names.insert(dimension.name.as_str()) {
                return Err(AnalyticsError::Configuration(format!(
                    "dimension '{}' is defined more than once",
                    dimension.name
                )));
            }
            if dimension.weight.is_sign_negative() {
                return Err(AnalyticsError::Configuration(format!(
                    "dimension '{}' has a negative weight",
                    dimension.name
                )));
            }
            dimension.normalizer.validate()?;
        }

        let total = dimensions
            .iter()
            .try_fold(Decimal::ZERO, |total, d| total.checked_add(d.weight))
            .ok_or_else(|| {
                AnalyticsError::Configuration("dimension weights overflow".to_string())
            })?;
        if !approx_eq(total, Decimal::ONE, WEIGHT_TOLERANCE) {
            return Err(AnalyticsError::WeightSum(total));
        }

        Ok(Self { dimensions })
    }

    pub fn dimension_names(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(|d| d.name.as_str())
    }

    /// Scores a list of raw values matched to dimensions by name.
    pub fn score(&self, inputs: &[DimensionInput]) -> Result<HealthScore, AnalyticsError> {
        self.score_with(|name| {
            inputs
                .iter()
                .find(|input| input.name == name)
                .map(|input| input.raw_value)
        })
    }

    /// Scores a metric map; keys without a matching dimension are ignored.
    pub fn score_metrics(
        &self,
        metrics: &BTreeMap<String, Decimal>,
    ) -> Result<HealthScore, AnalyticsError> {
        self.score_with(|name| metrics.get(name).copied())
    }

    fn score_with(
        &self,
        lookup: impl Fn(&str) -> Option<Decimal>,
    ) -> Result<HealthScore, AnalyticsError> {
        let mut weighted_sum = Decimal::ZERO;
        let mut dimensions = Vec::with_capacity(self.dimensions.len());

        for spec in &self.dimensions {
            let raw_value = lookup(&spec.name).ok_or_else(|| {
                AnalyticsError::Validation(format!(
                    "no value supplied for dimension '{}'",
                    spec.name
                ))
            })?;
            let score = clamp_score(spec.normalizer.normalize(raw_value));
            weighted_sum += score * spec.weight;

            dimensions.push(DimensionScore {
                name: spec.name.clone(),
                raw_value,
                score,
                weight: spec.weight,
            });
        }

        let overall_score = round_score(weighted_sum);
        let tier = Tier::from_score(Decimal::from(overall_score));
        tracing::debug!(overall_score, %tier, "Health score computed");

        Ok(HealthScore {
            overall_score,
            tier,
            dimensions,
        })
    }
}

/// Builds a scorecard from self-contained dimensions and scores it immediately.
pub fn score(dimensions: Vec<Dimension>) -> Result<HealthScore, AnalyticsError> {
    let mut inputs = Vec::with_capacity(dimensions.len());
    let mut specs = Vec::with_capacity(dimensions.len());
    for d in dimensions {
        inputs.push(DimensionInput::new(d.name.clone(), d.raw_value));
        specs.push(DimensionSpec {
            name: d.name,
            weight: d.weight,
            normalizer: d.normalizer,
        });
    }
    Scorecard::new(specs)?.score(&inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_thresholds_are_inclusive_on_the_lower_edge() {
        assert_eq!(Tier::from_score(dec!(74.999)), Tier::Fair);
        assert_eq!(Tier::from_score(dec!(75.0)), Tier::Good);
        assert_eq!(Tier::from_score(dec!(90)), Tier::Excellent);
        assert_eq!(Tier::from_score(dec!(89.99)), Tier::Good);
        assert_eq!(Tier::from_score(dec!(60)), Tier::Fair);
        assert_eq!(Tier::from_score(dec!(59.99)), Tier::Poor);
        assert_eq!(Tier::from_score(dec!(45)), Tier::Poor);
        assert_eq!(Tier::from_score(dec!(44.99)), Tier::Critical);
        assert_eq!(Tier::from_score(Decimal::ZERO), Tier::Critical);
    }

    #[test]
    fn inverse_threshold_interpolates_between_target_and_limit() {
        let n = Normalizer::InverseThreshold {
            target: dec!(10),
            limit: dec!(50),
        };
        assert_eq!(n.normalize(dec!(5)), dec!(100));
        assert_eq!(n.normalize(dec!(30)), dec!(50));
        assert_eq!(n.normalize(dec!(80)), Decimal::ZERO);
    }

    #[test]
    fn linear_normalizer_clamps() {
        let n = Normalizer::Linear {
            floor: dec!(0),
            ceiling: dec!(40),
        };
        assert_eq!(n.normalize(dec!(10)), dec!(25));
        assert_eq!(n.normalize(dec!(-5)), Decimal::ZERO);
        assert_eq!(n.normalize(dec!(400)), dec!(100));
    }

    #[test]
    fn degenerate_normalizers_fail_validation() {
        let linear = Normalizer::Linear {
            floor: dec!(10),
            ceiling: dec!(10),
        };
        assert!(linear.validate().is_err());
        let spec = DimensionSpec::new("x", Decimal::ONE, linear);
        assert!(Scorecard::new(vec![spec]).is_err());
    }
}
