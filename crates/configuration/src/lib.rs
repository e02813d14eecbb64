use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{
    AgingSettings, AnalyticsConfig, DimensionSettings, ForecastSettings, FunnelSettings,
    HealthSettings, NormalizerSettings, StageWeightSettings,
};

/// Loads the analytics configuration from a TOML file.
///
/// Sections missing from the file keep their defaults. The result is
/// validated before it is returned.
pub fn load_config(path: impl AsRef<Path>) -> Result<AnalyticsConfig, ConfigError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "Loading analytics configuration");

    let builder = config::Config::builder()
        .add_source(config::File::from(path).format(config::FileFormat::Toml))
        .build()?;

    finish(builder)
}

/// Parses configuration from an in-memory TOML document.
pub fn load_config_from_str(toml: &str) -> Result<AnalyticsConfig, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    finish(builder)
}

fn finish(builder: config::Config) -> Result<AnalyticsConfig, ConfigError> {
    // Attempt to deserialize the entire configuration into our `AnalyticsConfig` struct
    let config = builder.try_deserialize::<AnalyticsConfig>()?;
    config.validate()?;
    Ok(config)
}
