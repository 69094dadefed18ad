//!
//! src/errors.rs  Oct 19th, 2026
//!
//! Defines enums and methods of error conversion
//! for errors the resolver pipeline and track store use
//!
//!

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("unsupported link: {0}")]
    Unsupported(String),
    #[error("auth failure: {0}")]
    AuthFailure(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("lookup failure: {0}")]
    LookupFailure(String),
    #[error("track already added: {title} by {artist}")]
    DuplicateTrack { title: String, artist: String },
    #[error("config error: {0}")]
    Config(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("db error: {0}")]
    Db(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackError {
    /// Stable tag callers can branch on without matching message text
    pub fn kind(&self) -> &'static str {
        match self {
            TrackError::Unsupported(_)       => "unsupported",
            TrackError::AuthFailure(_)       => "auth_failure",
            TrackError::NotFound(_)          => "not_found",
            TrackError::LookupFailure(_)     => "lookup_failure",
            TrackError::DuplicateTrack { .. } => "duplicate_track",
            TrackError::Config(_)            => "config",
            TrackError::Parse(_)             => "parse",
            TrackError::Db(_)                => "db",
            TrackError::Io(_)                => "io",
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody { kind: self.kind(), message: self.to_string() }
    }
}

/// What the caller hands back to a user when a submission fails
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

impl From<reqwest::Error> for TrackError {
    fn from(e: reqwest::Error) -> Self { TrackError::LookupFailure(e.to_string()) }
}

impl From<serde_json::Error> for TrackError {
    fn from(e: serde_json::Error) -> Self { TrackError::Parse(e.to_string()) }
}

impl From<sqlx::Error> for TrackError {
    fn from(e: sqlx::Error) -> Self { TrackError::Db(e.to_string()) }
}

/// Raw outcome of a failed outbound call, before a resolver decides
/// which `TrackError` it becomes
#[derive(Error, Debug)]
#[error("{message}")]
pub struct FetchError {
    pub status: Option<StatusCode>,
    pub message: String,
}

impl FetchError {
    pub fn status(status: StatusCode, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("http status {status}")
        } else {
            format!("http status {status}: {}", truncate(body, 200))
        };
        Self { status: Some(status), message }
    }

    pub fn transport(e: reqwest::Error) -> Self {
        Self { status: None, message: e.to_string() }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self { status: None, message: message.into() }
    }

    pub fn has_status(&self, codes: &[StatusCode]) -> bool {
        self.status.is_some_and(|s| codes.contains(&s))
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
