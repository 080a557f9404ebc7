//! Error handling for the event planner client

use std::fmt;
use thiserror::Error;

use crate::events::EventId;

/// Unified error type for the event planner client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The auth or data API rejected the request.
    ///
    /// Displays as the backend's own message so it can be shown to the user verbatim.
    #[error("{message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// A required field is missing or empty
    #[error("{0}")]
    Validation(String),

    /// No authenticated user
    #[error("Not logged in")]
    NotAuthenticated,

    /// The session has not been resolved yet
    #[error("Session is still loading")]
    SessionPending,

    /// Another change is still being saved
    #[error("Another change is still being saved")]
    Busy,

    /// The event is not part of the local collection
    #[error("Unknown event: {0}")]
    UnknownEvent(EventId),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session storage errors
    #[error("Session storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Create a new backend API error
    pub fn api<T: fmt::Display>(status: reqwest::StatusCode, msg: T) -> Self {
        Error::Api {
            status,
            message: msg.to_string(),
        }
    }

    /// Create a new validation error
    pub fn validation<T: fmt::Display>(msg: T) -> Self {
        Error::Validation(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new session storage error
    pub fn storage<T: fmt::Display>(msg: T) -> Self {
        Error::Storage(msg.to_string())
    }

    /// Whether the failure came from the backend or the network rather than local checks
    pub fn is_backend(&self) -> bool {
        matches!(self, Error::Api { .. } | Error::Http(_) | Error::Json(_))
    }

    /// HTTP status of a backend rejection, if any
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(err) => err.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
