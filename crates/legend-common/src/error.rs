//! Error types for legend resolution and composition.

use thiserror::Error;

/// Result type alias using LegendError.
pub type LegendResult<T> = Result<T, LegendError>;

/// Primary error type for legend requests.
///
/// Every stage of the pipeline reports through this enum; the HTTP layer maps
/// the kind to a status code and an OGC exception code.
#[derive(Debug, Error)]
pub enum LegendError {
    // === Request Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    // === Tree Errors ===
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Layer not permitted: {0}")]
    Denied(String),

    #[error("Layer tree invariant violated at '{layer}': {message}")]
    ResolutionError { layer: String, message: String },

    // === Backend Errors ===
    #[error("Legend backend unavailable for '{layer}': {message}")]
    BackendUnavailable { layer: String, message: String },

    #[error("Legend backend returned an invalid response for '{layer}': {message}")]
    BackendBadResponse { layer: String, message: String },

    // === Composition Errors ===
    #[error("Failed to decode legend fragment {index} ({fragment}): {message}")]
    ImageDecodeError {
        index: usize,
        fragment: String,
        message: String,
    },

    #[error("No legend to show for: {0}")]
    EmptyResult(String),

    #[error("Failed to encode legend image: {0}")]
    EncodeError(String),

    // === Infrastructure Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Request timeout")]
    Timeout,
}

impl LegendError {
    /// Short, stable name of the error kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            LegendError::MissingParameter(_) | LegendError::InvalidParameter { .. } => {
                "bad_request"
            }
            LegendError::ServiceNotFound(_) | LegendError::LayerNotFound(_) => "not_found",
            LegendError::Denied(_) => "denied",
            LegendError::ResolutionError { .. } => "resolution_error",
            LegendError::BackendUnavailable { .. } => "backend_unavailable",
            LegendError::BackendBadResponse { .. } => "backend_bad_response",
            LegendError::ImageDecodeError { .. } => "image_decode_error",
            LegendError::EmptyResult(_) => "empty_result",
            LegendError::EncodeError(_) => "encode_error",
            LegendError::Config(_) => "config",
            LegendError::InternalError(_) => "internal",
            LegendError::Timeout => "timeout",
        }
    }

    /// Whether this error means "nothing is there for you" from the caller's view.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LegendError::ServiceNotFound(_) | LegendError::LayerNotFound(_)
        )
    }

    /// Get the OGC exception code for this error.
    pub fn exception_code(&self) -> &'static str {
        match self {
            LegendError::MissingParameter(_) => "MissingParameterValue",
            LegendError::InvalidParameter { .. } => "InvalidParameterValue",
            LegendError::ServiceNotFound(_) => "MapNotDefined",
            LegendError::LayerNotFound(_) | LegendError::EmptyResult(_) => "LayerNotDefined",
            LegendError::Denied(_) => "LayerNotPermitted",
            _ => "NoApplicableCode",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            LegendError::MissingParameter(_) | LegendError::InvalidParameter { .. } => 400,

            LegendError::ServiceNotFound(_)
            | LegendError::LayerNotFound(_)
            | LegendError::EmptyResult(_) => 404,

            LegendError::Denied(_) => 403,

            LegendError::BackendUnavailable { .. } | LegendError::BackendBadResponse { .. } => 502,

            LegendError::Timeout => 504,

            _ => 500,
        }
    }
}
