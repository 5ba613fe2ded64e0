//! Error type and transport seam shared by the client.

use async_trait::async_trait;
use hyper::{Body, Request, Response};
use thiserror::Error;

/// Result alias used by the Piston client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by [`PistonClient`](crate::PistonClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The client configuration is invalid (bad endpoint URL).
    #[error("client not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },

    /// The request was rejected locally and never sent.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Reason describing why the request could not be built.
        reason: String,
    },

    /// Transport failure, timeout, or non-success status from the service.
    #[error("service unavailable: {reason}")]
    ServiceUnavailable {
        /// Additional context about the failure.
        reason: String,
    },

    /// The service answered successfully but the body could not be decoded.
    #[error("malformed response: {reason}")]
    MalformedResponse {
        /// Additional context about the decoding failure.
        reason: String,
    },
}

impl ClientError {
    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for invalid requests.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for transport and status failures.
    #[must_use]
    pub fn service_unavailable(reason: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for undecodable responses.
    #[must_use]
    pub fn malformed_response(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }
}

/// HTTP transport used by the client to reach the execution service.
///
/// Implementations only move bytes: status handling, timeouts and decoding
/// are applied by the client. Failures should be reported as
/// [`ClientError::ServiceUnavailable`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and returns the response head with an unread body.
    async fn send(&self, request: Request<Body>) -> ClientResult<Response<Body>>;
}
