use thiserror::Error;

/// A record carrying values no backend should produce.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Record '{record_id}' has a negative {field}: {value}")]
    NegativeAmount {
        record_id: String,
        field: &'static str,
        value: String,
    },

    #[error("Record '{0}' has an empty id")]
    MissingId(String),
}
