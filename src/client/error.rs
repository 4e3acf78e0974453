//! Errors returned by the GleSYS API client.

use thiserror::Error;

/// Errors that can occur while talking to the GleSYS API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The addressed object does not exist (HTTP 404 or status code 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The API answered with a non-success status code.
    #[error("API error {code}: {text}")]
    Status {
        /// Status code from the response envelope.
        code: u16,
        /// Status text from the response envelope.
        text: String,
    },

    /// A request could not be built from the resource attributes.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The HTTP request itself failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether this error means the remote object is gone.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Status { code, .. } => *code == 404,
            _ => false,
        }
    }

    /// Build an error from a response envelope status.
    pub fn from_status(code: u16, text: impl Into<String>) -> Self {
        let text = text.into();
        if code == 404 {
            Self::NotFound(text)
        } else {
            Self::Status { code, text }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_404_to_not_found() {
        let err = ApiError::from_status(404, "Server not found");
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_status_display() {
        let err = ApiError::from_status(400, "Invalid hostname");
        assert_eq!(err.to_string(), "API error 400: Invalid hostname");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_raw_404_status_is_not_found() {
        let err = ApiError::Status {
            code: 404,
            text: "gone".to_string(),
        };
        assert!(err.is_not_found());
    }
}
