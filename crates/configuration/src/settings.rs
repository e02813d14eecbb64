use crate::error::ConfigError;
use core_types::Stage;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// The root configuration structure for the analytics engine.
///
/// Every section is optional in the TOML file; missing sections fall back to
/// the defaults below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub aging: AgingSettings,
    pub funnel: FunnelSettings,
    pub forecast: ForecastSettings,
    pub health: HealthSettings,
}

/// Bucket layout for receivables aging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgingSettings {
    /// Lower edges of each bucket in days overdue. Must be strictly increasing.
    pub boundaries: Vec<i64>,
    /// Optional explicit labels. Generated from the boundaries when omitted.
    pub labels: Option<Vec<String>>,
}

/// Stage layout and trend parameters for the sales funnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunnelSettings {
    pub stage_order: Vec<Stage>,
    /// Minimum change, in percentage points, before a trend is reported.
    pub trend_epsilon: Decimal,
    /// Length of the trend comparison window in days. `0` disables trends.
    pub trend_window_days: u32,
    /// Transitions converting below this percentage are reported as breaks.
    pub break_threshold_pct: Decimal,
}

/// A single row of the win-probability table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageWeightSettings {
    pub stage: Stage,
    pub probability: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub stage_weights: Vec<StageWeightSettings>,
    pub confidence_level: Decimal,
}

/// How a raw metric is mapped onto the 0-100 score axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizerSettings {
    /// Higher is better: `floor` scores 0, `ceiling` scores 100.
    Linear { floor: Decimal, ceiling: Decimal },
    /// Lower is better: `target` or less scores 100, `limit` or more scores 0.
    InverseThreshold { target: Decimal, limit: Decimal },
    /// The metric is already a percentage.
    Percentage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSettings {
    pub name: String,
    pub weight: Decimal,
    pub normalizer: NormalizerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSettings {
    pub dimensions: Vec<DimensionSettings>,
}

impl Default for AgingSettings {
    fn default() -> Self {
        Self {
            boundaries: vec![0, 30, 60, 90],
            labels: None,
        }
    }
}

impl Default for FunnelSettings {
    fn default() -> Self {
        Self {
            stage_order: ["lead", "qualified", "proposal", "negotiation", "won"]
                .into_iter()
                .map(Stage::from)
                .collect(),
            trend_epsilon: dec!(2),
            trend_window_days: 30,
            break_threshold_pct: dec!(20),
        }
    }
}

impl Default for ForecastSettings {
    fn default() -> Self {
        let weights = [
            ("lead", dec!(0.10)),
            ("qualified", dec!(0.25)),
            ("proposal", dec!(0.50)),
            ("negotiation", dec!(0.75)),
            ("won", dec!(1.00)),
        ];
        Self {
            stage_weights: weights
                .into_iter()
                .map(|(stage, probability)| StageWeightSettings {
                    stage: Stage::from(stage),
                    probability,
                })
                .collect(),
            confidence_level: dec!(0.80),
        }
    }
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            dimensions: vec![
                DimensionSettings {
                    name: "overdue_ratio_pct".to_string(),
                    weight: dec!(0.40),
                    normalizer: NormalizerSettings::InverseThreshold {
                        target: dec!(5),
                        limit: dec!(50),
                    },
                },
                DimensionSettings {
                    name: "funnel_conversion_pct".to_string(),
                    weight: dec!(0.35),
                    normalizer: NormalizerSettings::Linear {
                        floor: dec!(0),
                        ceiling: dec!(40),
                    },
                },
                DimensionSettings {
                    name: "avg_days_overdue".to_string(),
                    weight: dec!(0.25),
                    normalizer: NormalizerSettings::InverseThreshold {
                        target: dec!(15),
                        limit: dec!(90),
                    },
                },
            ],
        }
    }
}

impl AnalyticsConfig {
    /// Structural checks that do not need the analytics crate.
    ///
    /// The analytics engine re-validates everything it consumes; this pass only
    /// catches the mistakes that are obvious from the file alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aging.boundaries.is_empty() {
            return Err(ConfigError::invalid("aging", "boundaries must not be empty"));
        }
        if self.funnel.stage_order.is_empty() {
            return Err(ConfigError::invalid("funnel", "stage_order must not be empty"));
        }
        if self.funnel.trend_epsilon.is_sign_negative() {
            return Err(ConfigError::invalid("funnel", "trend_epsilon must not be negative"));
        }
        let confidence = self.forecast.confidence_level;
        if confidence < Decimal::ZERO || confidence > Decimal::ONE {
            return Err(ConfigError::invalid(
                "forecast",
                format!("confidence_level must be between 0 and 1, got {confidence}"),
            ));
        }
        if self.health.dimensions.is_empty() {
            return Err(ConfigError::invalid("health", "dimensions must not be empty"));
        }
        Ok(())
    }
}
