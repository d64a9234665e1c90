//! # Tracking Errors

use thiserror::Error;

/// Error codes for the tracking client.
///
/// None of these are fatal to a tracking screen: callers log them and fall
/// back to the neutral display state.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("code: http_error, description: {0}")]
    Http(String),

    #[error("code: unauthorized, description: {0}")]
    Unauthorized(String),

    #[error("code: not_found, description: {0}")]
    NotFound(String),

    #[error("code: invalid_format, description: {0}")]
    InvalidFormat(String),

    #[error("code: channel_error, description: {0}")]
    Channel(String),

    #[error("code: config_error, description: {0}")]
    Config(String),

    #[error("code: server_error, description: {0}")]
    ServerError(String),
}

impl Error {
    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::Http(_) => "http_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::InvalidFormat(_) => "invalid_format",
            Self::Channel(_) => "channel_error",
            Self::Config(_) => "config_error",
            Self::ServerError(_) => "server_error",
        }
    }

    /// Returns the error description.
    #[must_use]
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        if let Some(inner) = err.downcast_ref::<Self>() {
            return inner.clone();
        }
        let stack = err.chain().fold(String::new(), |cause, e| format!("{cause} -> {e}"));
        let stack = stack.trim_start_matches(" -> ").to_string();
        Self::ServerError(stack)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::InvalidFormat(err.to_string());
        }
        Self::Http(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}

impl From<rust_socketio::Error> for Error {
    fn from(err: rust_socketio::Error) -> Self {
        Self::Channel(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
