use crate::aging::{aggregate_aging, AgingSummary};
use crate::bucketing::BucketScheme;
use crate::error::AnalyticsError;
use crate::forecast::{forecast, ForecastSummary, StageWeights};
use crate::funnel::{
    analyze_funnel, validate_window_length, FunnelConfig, FunnelSummary, PipelineBreak,
    TrendWindow,
};
use crate::health::{DimensionSpec, HealthScore, Normalizer, Scorecard};
use crate::numeric::{percentage, HUNDRED};
use crate::report::DashboardReport;
use chrono::NaiveDate;
use configuration::{AnalyticsConfig, NormalizerSettings};
use core_types::Record;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Metric names produced by [`derived_metrics`].
pub const METRIC_OVERDUE_RATIO: &str = "overdue_ratio_pct";
pub const METRIC_AVG_DAYS_OVERDUE: &str = "avg_days_overdue";
pub const METRIC_FUNNEL_CONVERSION: &str = "funnel_conversion_pct";
pub const METRIC_EXCLUDED_RATIO: &str = "excluded_ratio_pct";

/// The configured analyzers, validated once and reusable across calls.
///
/// The engine keeps no state between calls. Every method borrows its records
/// and returns a freshly computed summary, so one engine can be shared across
/// threads.
#[derive(Debug)]
pub struct AnalyticsEngine {
    aging_scheme: BucketScheme,
    funnel: FunnelConfig,
    trend_window_days: Option<u32>,
    break_threshold_pct: Decimal,
    weights: StageWeights,
    scorecard: Scorecard,
}

impl AnalyticsEngine {
    /// Validates every section of `config` before any analysis runs.
    pub fn from_config(config: &AnalyticsConfig) -> Result<Self, AnalyticsError> {
        let aging_scheme = match &config.aging.labels {
            Some(labels) => BucketScheme::new(config.aging.boundaries.clone(), labels.clone())?,
            None => BucketScheme::with_default_labels(config.aging.boundaries.clone())?,
        };

        let funnel = FunnelConfig::new(config.funnel.stage_order.clone())?
            .with_trend_epsilon(config.funnel.trend_epsilon)?;

        // Zero disables trends.
        let trend_window_days = config.funnel.trend_window_days;
        if trend_window_days > 0 {
            validate_window_length(trend_window_days)?;
        }

        let break_threshold_pct = config.funnel.break_threshold_pct;
        if break_threshold_pct < Decimal::ZERO || break_threshold_pct > HUNDRED {
            return Err(AnalyticsError::Configuration(format!(
                "break threshold must be between 0 and 100, got {break_threshold_pct}"
            )));
        }

        let weights = StageWeights::new(
            config
                .forecast
                .stage_weights
                .iter()
                .map(|w| (w.stage.clone(), w.probability))
                .collect(),
        )?
        .with_confidence_level(config.forecast.confidence_level)?;

        let scorecard = Scorecard::new(
            config
                .health
                .dimensions
                .iter()
                .map(|d| {
                    DimensionSpec::new(d.name.clone(), d.weight, Normalizer::from(&d.normalizer))
                })
                .collect(),
        )?;

        tracing::info!(
            buckets = aging_scheme.len(),
            stages = funnel.stage_order().len(),
            weighted_stages = weights.len(),
            "Analytics engine configured"
        );

        Ok(Self {
            aging_scheme,
            funnel,
            trend_window_days: (trend_window_days > 0).then_some(trend_window_days),
            break_threshold_pct,
            weights,
            scorecard,
        })
    }

    pub fn aging(&self, records: &[Record], reference_date: NaiveDate) -> AgingSummary {
        aggregate_aging(records, reference_date, &self.aging_scheme)
    }

    /// Funnel analysis. Trends are computed only when `as_of` is given and a
    /// trend window is configured.
    pub fn funnel(&self, records: &[Record], as_of: Option<NaiveDate>) -> FunnelSummary {
        match (as_of, self.trend_window_days) {
            (Some(as_of), Some(days)) => {
                let config = self.funnel.windowed(TrendWindow::new(as_of, days));
                analyze_funnel(records, &config)
            }
            _ => analyze_funnel(records, &self.funnel),
        }
    }

    pub fn pipeline_breaks(&self, funnel: &FunnelSummary) -> Vec<PipelineBreak> {
        funnel.bottlenecks(self.break_threshold_pct)
    }

    pub fn forecast(&self, records: &[Record]) -> Result<ForecastSummary, AnalyticsError> {
        forecast(records, &self.weights)
    }

    pub fn health(
        &self,
        metrics: &BTreeMap<String, Decimal>,
    ) -> Result<HealthScore, AnalyticsError> {
        self.scorecard.score_metrics(metrics)
    }

    /// Runs every analyzer over one snapshot and scores the result.
    ///
    /// Only records carrying a stage are forecast. An open record whose stage
    /// has no weight still fails the whole dashboard.
    ///
    /// `extra_metrics` are merged over the derived ones, so a caller can both
    /// supply dimensions the engine cannot compute and override derived values.
    pub fn dashboard(
        &self,
        records: &[Record],
        reference_date: NaiveDate,
        extra_metrics: &BTreeMap<String, Decimal>,
    ) -> Result<DashboardReport, AnalyticsError> {
        let aging = self.aging(records, reference_date);
        let funnel = self.funnel(records, Some(reference_date));

        // Stageless records are receivables, not pipeline.
        let pipeline: Vec<Record> = records.iter().filter(|r| r.stage.is_some()).cloned().collect();
        let forecast = self.forecast(&pipeline)?;

        let mut metrics = derived_metrics(&aging, &funnel);
        metrics.extend(extra_metrics.iter().map(|(k, v)| (k.clone(), *v)));

        let health = self.health(&metrics)?;

        if aging.count_excluded + funnel.count_excluded > 0 {
            tracing::info!(
                aging_excluded = aging.count_excluded,
                funnel_excluded = funnel.count_excluded,
                "Some records were excluded from the dashboard"
            );
        }

        Ok(DashboardReport {
            reference_date,
            aging,
            funnel,
            forecast,
            metrics,
            health,
        })
    }
}

/// Health inputs that can be read straight off aging and funnel summaries.
pub fn derived_metrics(
    aging: &AgingSummary,
    funnel: &FunnelSummary,
) -> BTreeMap<String, Decimal> {
    let aged_or_excluded = aging.total_records + aging.count_excluded;
    let excluded_ratio = percentage(
        Decimal::from(aging.count_excluded),
        Decimal::from(aged_or_excluded),
    );

    BTreeMap::from([
        (
            METRIC_OVERDUE_RATIO.to_string(),
            aging.overdue_ratio_pct().unwrap_or_default(),
        ),
        (
            METRIC_AVG_DAYS_OVERDUE.to_string(),
            aging.weighted_average_days_overdue.unwrap_or_default(),
        ),
        (
            METRIC_FUNNEL_CONVERSION.to_string(),
            funnel.overall_conversion_pct().unwrap_or_default(),
        ),
        (
            METRIC_EXCLUDED_RATIO.to_string(),
            excluded_ratio.unwrap_or_default(),
        ),
    ])
}

impl From<&NormalizerSettings> for Normalizer {
    fn from(settings: &NormalizerSettings) -> Self {
        match *settings {
            NormalizerSettings::Linear { floor, ceiling } => Normalizer::Linear { floor, ceiling },
            NormalizerSettings::InverseThreshold { target, limit } => {
                Normalizer::InverseThreshold { target, limit }
            }
            NormalizerSettings::Percentage => Normalizer::Percentage,
        }
    }
}
