//! Host-facing error taxonomy.
//!
//! Lower layers have their own errors ([`ApiError`] for the HTTP client,
//! [`WaitError`] for the waiter). Both convert into [`ProviderError`], which
//! in turn maps onto gRPC status codes and host diagnostics.

use thiserror::Error;

use crate::client::ApiError;
use crate::wait::WaitError;

/// Errors that can occur while serving a host request.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote object was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Configuration or identifier did not pass validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Bug or broken invariant inside the provider.
    #[error("Internal error: {0}")]
    Internal(String),

    /// The provider is unconfigured or misconfigured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The host asked for a resource or data source type that does not exist.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Quota or rate limit exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The API could not be reached or answered with a server error.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// A wait did not see its target before the deadline.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// The remote object is in a state that does not allow the operation.
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// The API rejected the request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// The message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Internal(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::PermissionDenied(msg)
            | Self::ResourceExhausted(msg)
            | Self::Unavailable(msg)
            | Self::DeadlineExceeded(msg)
            | Self::FailedPrecondition(msg)
            | Self::Unimplemented(msg)
            | Self::InvalidRequest(msg) => msg,
            Self::Serialization(_) => "serialization error (see Debug output)",
            Self::Transport(_) => "transport error (see Debug output)",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<ApiError> for ProviderError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound(msg) => Self::NotFound(msg),
            ApiError::Status { code, text } => {
                let msg = format!("GleSYS API returned {}: {}", code, text);
                match code {
                    404 => Self::NotFound(text),
                    401 | 403 => Self::PermissionDenied(msg),
                    429 => Self::ResourceExhausted(msg),
                    500..=599 => Self::Unavailable(msg),
                    _ => Self::InvalidRequest(msg),
                }
            },
            ApiError::InvalidRequest(msg) => Self::Validation(msg),
            ApiError::Http(err) => Self::Unavailable(err.to_string()),
            ApiError::Decode(err) => Self::Internal(format!("unexpected API response: {}", err)),
        }
    }
}

impl From<WaitError> for ProviderError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Timeout { .. } => Self::DeadlineExceeded(err.to_string()),
            WaitError::UnexpectedState { .. } => Self::FailedPrecondition(err.to_string()),
            WaitError::NotFound { .. } => Self::NotFound(err.to_string()),
            WaitError::Refresh(api) => api.into(),
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Internal(msg) => tonic::Status::internal(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            },
            ProviderError::PermissionDenied(msg) => tonic::Status::permission_denied(msg),
            ProviderError::ResourceExhausted(msg) => tonic::Status::resource_exhausted(msg),
            ProviderError::Unavailable(msg) => tonic::Status::unavailable(msg),
            ProviderError::DeadlineExceeded(msg) => tonic::Status::deadline_exceeded(msg),
            ProviderError::FailedPrecondition(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            ProviderError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
        }
    }
}
