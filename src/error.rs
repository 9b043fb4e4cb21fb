//! Error types for the trade-log relayer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Main error type for the relayer
#[derive(Error, Debug)]
pub enum TradelogError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Account lookup failed for {address}: {message}")]
    AccountLookup { address: String, message: String },

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Transaction submission failed: {0}")]
    Submission(String),

    #[error("Timeout waiting for confirmation of {tx_hash} after {waited_ms}ms")]
    ConfirmationTimeout { tx_hash: String, waited_ms: u64 },

    #[error("Resource {resource_type} not found for account {address}")]
    ResourceNotFound {
        address: String,
        resource_type: String,
    },

    #[error("Upstream {service} error: {message}")]
    UpstreamApi { service: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TradelogError {
    pub fn upstream(service: &str, message: impl Into<String>) -> Self {
        TradelogError::UpstreamApi {
            service: service.to_string(),
            message: message.into(),
        }
    }

    /// Check if error is retryable
    ///
    /// Retrying means re-running the whole operation, which for submissions
    /// re-fetches a fresh sequence number.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TradelogError::ConfirmationTimeout { .. } | TradelogError::UpstreamApi { .. }
        )
    }

    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            TradelogError::Config(_) => "config",
            TradelogError::AccountLookup { .. } => "account_lookup",
            TradelogError::Signing(_) => "signing",
            TradelogError::Submission(_) => "submission",
            TradelogError::ConfirmationTimeout { .. } => "confirmation_timeout",
            TradelogError::ResourceNotFound { .. } => "resource_not_found",
            TradelogError::UpstreamApi { .. } => "upstream_api",
            TradelogError::InvalidInput(_) => "invalid_input",
            TradelogError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            TradelogError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TradelogError::AccountLookup { .. } | TradelogError::ResourceNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            TradelogError::ConfirmationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub error: &'static str,
    pub message: String,
}

impl From<&TradelogError> for ErrorBody {
    fn from(err: &TradelogError) -> Self {
        Self {
            status: "error",
            error: err.kind(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for TradelogError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(kind = self.kind(), "Request failed: {}", self);
        } else {
            warn!(kind = self.kind(), "Request rejected: {}", self);
        }
        (status, Json(ErrorBody::from(&self))).into_response()
    }
}

/// Result type for relayer operations
pub type TradelogResult<T> = Result<T, TradelogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            TradelogError::InvalidInput("amount".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TradelogError::upstream("coingecko", "rate limited").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            TradelogError::ConfirmationTimeout {
                tx_hash: "0x1".into(),
                waited_ms: 10
            }
            .status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_error_body_carries_kind() {
        let err = TradelogError::ResourceNotFound {
            address: "0x1".into(),
            resource_type: "0x1::coin::CoinStore".into(),
        };
        let body = ErrorBody::from(&err);
        assert_eq!(body.status, "error");
        assert_eq!(body.error, "resource_not_found");
        assert!(body.message.contains("0x1::coin::CoinStore"));
    }

    #[test]
    fn test_retryable() {
        assert!(TradelogError::upstream("chain", "503").is_retryable());
        assert!(!TradelogError::Submission("SEQUENCE_NUMBER_TOO_OLD".into()).is_retryable());
    }
}
