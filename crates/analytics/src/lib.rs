//! # Bizlytics Analytics Engine
//!
//! This crate turns snapshots of transactional records (invoices, purchase
//! orders, opportunities) into the summaries behind the finance and sales
//! dashboards: receivables aging, funnel conversion, weighted forecasts and
//! composite health scores.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of the
//!   backend API, files or the UI. It depends only on `core-types` and
//!   `configuration` (Layer 0).
//! - **Stateless Calculation:** Every analyzer is a function of its inputs.
//!   The same records and configuration always produce the same summary.
//! - **Two failure modes:** bad rows are excluded and counted in the summary;
//!   bad configuration fails loudly with an `AnalyticsError`.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: all analyzers, configured and validated in one place.
//! - `aggregate_aging`, `analyze_funnel`, `forecast`, `score`: the analyzers
//!   themselves, usable without the engine.
//! - `BucketScheme`, `FunnelConfig`, `StageWeights`, `Scorecard`: validated
//!   configuration for each analyzer.
//! - `AnalyticsError`: the error type returned from this crate.

// Declare the modules that constitute this crate.
pub mod aging;
pub mod bucketing;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod funnel;
pub mod health;
pub mod numeric;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use aging::{aggregate_aging, aggregate_aging_default, AgingBucket, AgingSummary};
pub use bucketing::{bucket_of, Bucket, BucketScheme};
pub use engine::{derived_metrics, AnalyticsEngine};
pub use error::AnalyticsError;
pub use forecast::{forecast, ForecastSummary, StageForecast, StageWeights};
pub use funnel::{
    analyze_funnel, FunnelConfig, FunnelStage, FunnelSummary, PipelineBreak, TrendWindow,
    MAX_TREND_WINDOW_DAYS,
};
pub use health::{
    score, Dimension, DimensionInput, DimensionScore, DimensionSpec, HealthScore, Normalize,
    Normalizer, Scorecard, Tier,
};
pub use numeric::Magnitude;
pub use report::{DashboardReport, Exclusion, ExclusionReason};
