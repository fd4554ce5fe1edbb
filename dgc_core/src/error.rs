//! Errors surfaced by the timeline upstream.

use std::fmt::Display;

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for timeline fetches.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// The timeline could not be fetched.
///
/// Transport failures, non-success statuses, invalid JSON and a wrongly shaped payload all
/// collapse into this one kind. Only the message tells them apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UpstreamError {
    message: String,
}

impl UpstreamError {
    /// The request never produced a response (connect error, timeout, broken body).
    pub fn transport(err: impl Display) -> Self {
        Self {
            message: format!("timeline fetch failed: {err}"),
        }
    }

    /// The upstream answered with a non-success status.
    pub fn status(status: StatusCode) -> Self {
        Self {
            message: format!("timeline fetch failed: upstream responded with {status}"),
        }
    }

    /// The body is not JSON.
    pub fn invalid_json(err: impl Display) -> Self {
        Self {
            message: format!("timeline returned invalid JSON: {err}"),
        }
    }

    /// The body is JSON, but not a top-level array.
    pub fn unexpected_payload(kind: &str) -> Self {
        Self {
            message: format!("timeline returned unexpected payload: expected an array, got {kind}"),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            UpstreamError::status(StatusCode::INTERNAL_SERVER_ERROR).to_string(),
            "timeline fetch failed: upstream responded with 500 Internal Server Error"
        );
        assert_eq!(
            UpstreamError::unexpected_payload("an object").message(),
            "timeline returned unexpected payload: expected an array, got an object"
        );
        assert!(UpstreamError::invalid_json("EOF while parsing")
            .message()
            .starts_with("timeline returned invalid JSON"));
    }
}
