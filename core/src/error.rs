//! Error taxonomy for everything that crosses the HTTP boundary.
//!
//! Failures are classified exactly once, inside the gateway, into one of the
//! [`ErrorKind`] buckets. Callers never see raw transport or decode errors.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Classified failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// HTTP 401. The session has been torn down.
    Unauthorized,
    /// HTTP 403. The session is left untouched.
    Forbidden,
    /// HTTP 404.
    NotFound,
    /// Any other 4xx.
    Validation,
    /// 5xx, or a success response the client could not decode.
    ServerError,
    /// No response received (connect failure, timeout, reset).
    Network,
}

impl ErrorKind {
    /// Default user-facing message for this kind.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "Unauthorized. Please log in.",
            ErrorKind::Forbidden => "You do not have permission to perform this action.",
            ErrorKind::NotFound => "The requested resource was not found.",
            ErrorKind::Validation => "Please check your input and try again.",
            ErrorKind::ServerError => "Server error. Please try again later.",
            ErrorKind::Network => "Network error. Please check your connection.",
        }
    }

    /// Maps a non-success HTTP status onto the taxonomy.
    ///
    /// Returns `None` for 1xx/2xx/3xx statuses.
    pub fn from_status(status: StatusCode) -> Option<Self> {
        match status.as_u16() {
            401 => Some(ErrorKind::Unauthorized),
            403 => Some(ErrorKind::Forbidden),
            404 => Some(ErrorKind::NotFound),
            400..=499 => Some(ErrorKind::Validation),
            500..=599 => Some(ErrorKind::ServerError),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not found",
            ErrorKind::Validation => "validation",
            ErrorKind::ServerError => "server error",
            ErrorKind::Network => "network",
        };
        f.write_str(name)
    }
}

/// A classified failure, as surfaced by the gateway and stored in resource slots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    /// Classification of the failure.
    pub kind: ErrorKind,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Human-readable message.
    pub message: String,
}

impl ApiError {
    /// Error with the kind's default message.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            status: None,
            message: kind.default_message().to_string(),
        }
    }

    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Builds the error for a non-success response.
    ///
    /// Validation failures surface the server's own message when the body
    /// carries one; every other kind uses the fixed message table.
    pub fn from_response(kind: ErrorKind, status: StatusCode, body: &[u8]) -> Self {
        let message = match kind {
            ErrorKind::Validation => server_message(body)
                .unwrap_or_else(|| kind.default_message().to_string()),
            _ => kind.default_message().to_string(),
        };
        Self {
            kind,
            status: Some(status.as_u16()),
            message,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ErrorKind::Unauthorized
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

fn server_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    parsed
        .message
        .or(parsed.error)
        .filter(|m| !m.trim().is_empty())
}

/// Result type for gateway and resource operations.
pub type ApiResult<T> = Result<T, ApiError>;
