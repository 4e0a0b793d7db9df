//! Error types for the adapter.
//!
//! # Design
//! `ApiError` covers a single HTTP exchange: the transport failed, the
//! server answered with a non-2xx status, or the body was not the JSON we
//! expected. `AdapterError` is what operations and option loaders return:
//! configuration mistakes in a row, or an `ApiError` wrapped with the action
//! that was being attempted. `ExecutionError` pins an `AdapterError` to the
//! input row that caused a run to abort.

use thiserror::Error;

/// Errors produced by one request/response exchange.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received (connection refused, timeout, ...).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server returned a non-2xx status.
    #[error("HTTP {status}: {}", http_message(.detail, .body))]
    Http {
        status: u16,
        /// Upstream `detail` (or `message`) field, when the body was JSON.
        detail: Option<String>,
        body: String,
    },

    /// The response body could not be deserialized into the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

fn http_message<'a>(detail: &'a Option<String>, body: &'a str) -> &'a str {
    detail.as_deref().unwrap_or(body)
}

impl ApiError {
    /// The message shown to users: the upstream detail when the server sent
    /// one, otherwise the error itself.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Http {
                detail: Some(detail),
                ..
            } => detail.clone(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors returned by operations and option loaders.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Operation {operation} is not supported for resource {resource}")]
    UnsupportedOperation { resource: String, operation: String },

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Unknown option loader: {0}")]
    UnknownLoader(String),

    #[error("Invalid credentials configuration: {0}")]
    Credentials(String),

    /// An HTTP exchange failed while performing `action`,
    /// e.g. `get person "/people/1"`.
    #[error("Failed to {action}: {}", .source.detail())]
    Request { action: String, source: ApiError },

    /// An option loader's pagination walk failed.
    #[error("Failed to load {what}: {}", .source.detail())]
    LoadOptions { what: String, source: ApiError },
}

impl AdapterError {
    /// True for mistakes in the row's configuration, as opposed to failures
    /// reported by the remote API.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            AdapterError::Request { .. } | AdapterError::LoadOptions { .. }
        )
    }
}

/// A row-level failure that aborted an execution run.
#[derive(Debug, Error)]
#[error("item {item_index}: {source}")]
pub struct ExecutionError {
    pub item_index: usize,
    pub source: AdapterError,
}
