//! Databento-specific error types.

use thiserror::Error;

use crate::application::ports::SymbologyError;

/// Errors from the Databento adapter.
#[derive(Debug, Error, Clone)]
pub enum DatabentoError {
    /// No API key configured.
    #[error("Databento API key is missing")]
    MissingApiKey,

    /// Request could not be built or sent.
    #[error("Network error: {0}")]
    Network(String),

    /// API returned a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error detail from the API.
        message: String,
    },

    /// Range response is not line-delimited JSON.
    #[error("unsupported response content type: {content_type:?}")]
    UnsupportedResponse {
        /// Content type the server sent.
        content_type: String,
    },

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(String),
}

impl From<DatabentoError> for SymbologyError {
    fn from(err: DatabentoError) -> Self {
        match err {
            DatabentoError::Api { status, message } => Self::Rejected { status, message },
            DatabentoError::JsonParse(message) => Self::InvalidResponse { message },
            DatabentoError::UnsupportedResponse { content_type } => Self::InvalidResponse {
                message: format!("content type {content_type:?}"),
            },
            other @ (DatabentoError::MissingApiKey | DatabentoError::Network(_)) => {
                Self::Transport {
                    message: other.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_maps_to_rejected() {
        let err: SymbologyError = DatabentoError::Api {
            status: 422,
            message: "bad dataset".to_string(),
        }
        .into();
        assert!(matches!(err, SymbologyError::Rejected { status: 422, .. }));
    }

    #[test]
    fn network_error_maps_to_transport() {
        let err: SymbologyError = DatabentoError::Network("reset".to_string()).into();
        assert!(matches!(err, SymbologyError::Transport { message } if message.contains("reset")));
    }
}
