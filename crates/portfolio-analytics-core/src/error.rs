use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl AnalyticsError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        AnalyticsError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(e: serde_json::Error) -> Self {
        AnalyticsError::SerializationError(e.to_string())
    }
}
