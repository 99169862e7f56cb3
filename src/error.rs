// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shell error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Shell error type shared by the gateway, session controller, and router.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// No response reached us (connect, DNS, body read).
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    /// Backend answered with a non-success status other than an intercepted 401.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Terminal authentication failure; the session has been invalidated.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ShellError {
    /// Human-readable message suitable for an error-reply envelope.
    pub fn user_message(&self) -> String {
        match self {
            ShellError::Http { message, .. } => message.clone(),
            ShellError::AuthenticationFailed(_) => {
                "Your session has expired. Please sign in again.".to_string()
            }
            ShellError::Timeout => "The server took too long to respond.".to_string(),
            ShellError::Transport(_) => "Unable to reach the server.".to_string(),
            other => other.to_string(),
        }
    }

    /// True for terminal auth failures that invalidated the session.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ShellError::AuthenticationFailed(_))
    }

    /// Build an HTTP error from a status code and raw response body.
    ///
    /// Backends report domain errors as `{"message": ...}` or `{"error": ...}`;
    /// anything else falls back to the status line.
    pub fn from_response(status: reqwest::StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                ["message", "error"]
                    .iter()
                    .find_map(|key| v.get(*key).and_then(|m| m.as_str()).map(str::to_string))
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Request failed with status {}", status));

        ShellError::Http {
            status: status.as_u16(),
            message,
        }
    }
}

impl From<reqwest::Error> for ShellError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ShellError::Timeout
        } else if err.is_decode() {
            ShellError::Decode(err.to_string())
        } else {
            ShellError::Transport(err.to_string())
        }
    }
}

/// Cloneable refresh outcome shared by every caller waiting on one refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct RefreshFailure(pub String);

impl From<RefreshFailure> for ShellError {
    fn from(err: RefreshFailure) -> Self {
        ShellError::AuthenticationFailed(err.0)
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ShellError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            ShellError::AuthenticationFailed(_) => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            ShellError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            ShellError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "timeout", None),
            ShellError::Transport(_) | ShellError::Http { .. } | ShellError::Decode(_) => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                Some(self.user_message()),
            ),
            ShellError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias used across the crate
pub type Result<T> = std::result::Result<T, ShellError>;
