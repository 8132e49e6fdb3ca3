//! Error types for wafburst.
//!
//! Only [`ConfigError`] and [`DataError`] ever reach a caller of a run.
//! Per-request transport failures are recorded as sentinel outcomes and
//! chart failures ([`RenderError`]) are logged and skipped.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid run configuration. The run never starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("URL must not be empty")]
    EmptyUrl,

    #[error("URL must start with http:// or https://: {0}")]
    Scheme(String),

    #[error("invalid URL {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URL must contain a host: {0}")]
    MissingHost(String),

    #[error("host is too short: {0}")]
    HostTooShort(String),

    #[error("host must contain at least one dot: {0}")]
    HostWithoutDot(String),

    #[error("threads must be between {min} and {max}, got {value}")]
    Threads { value: usize, min: usize, max: usize },

    #[error("duration must be between {min} and {max} seconds, got {value}")]
    Duration { value: u64, min: u64, max: u64 },

    #[error("rate limit must be between 0 and {max} requests/second, got {value}")]
    RateLimit { value: u32, max: u32 },

    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("{path} must be one of: {expected}")]
    Extension { path: PathBuf, expected: &'static str },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: {reason}")]
    Structure { path: PathBuf, reason: String },

    #[error("invalid header {name:?}: {reason}")]
    Header { name: String, reason: String },
}

/// Result set cannot be reported on. Raw outcomes stay with the caller.
#[derive(Error, Debug, PartialEq)]
pub enum DataError {
    #[error("no test result data")]
    Empty,

    #[error("outcome #{index} has an invalid {field}")]
    Malformed { index: usize, field: &'static str },
}

/// A chart could not be drawn.
#[derive(Error, Debug)]
#[error("failed to render {chart}: {message}")]
pub struct RenderError {
    pub chart: &'static str,
    pub message: String,
}

impl RenderError {
    pub fn new(chart: &'static str, message: impl ToString) -> Self {
        Self {
            chart,
            message: message.to_string(),
        }
    }
}

/// Crate-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to set up HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("report error: {0}")]
    Data(#[from] DataError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
