use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read, parsed as TOML, or mapped onto the settings structs.
    #[error("Failed to load analytics configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    /// The document parsed but holds values the analyzers cannot use.
    #[error("Invalid analytics configuration: {section}: {message}")]
    ValidationError {
        section: &'static str,
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(section: &'static str, message: impl Into<String>) -> Self {
        Self::ValidationError {
            section,
            message: message.into(),
        }
    }
}
