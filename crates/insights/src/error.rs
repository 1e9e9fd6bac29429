//! Error types for insights.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InsightsError {
    /// Serializing the report failed
    #[error("failed to render report: {0}")]
    Render(#[from] serde_json::Error),
}
