use serde::{Deserialize, Serialize};

/// Lifecycle status of a transactional record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Open,
    Won,
    Lost,
    Paid,
    Cancelled,
}

impl RecordStatus {
    /// Returns true once the record can no longer move through a pipeline.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RecordStatus::Open)
    }
}

/// Direction of a metric between two consecutive windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Stable,
}
