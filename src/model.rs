use chrono::{DateTime, Local};
use indexmap::IndexMap;
use std::time::Duration;

/// Status recorded when the request never produced an HTTP response.
pub const TRANSPORT_FAILURE: i32 = -1;

/// One full set of query parameters for a single request, in the order
/// they are sent.
pub type ParamSet = IndexMap<String, String>;

/// Header name to value, in the order they are sent.
pub type HeaderSet = IndexMap<String, String>;

/// Normalized result of one request attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub timestamp: DateTime<Local>,
    /// HTTP status code, or [`TRANSPORT_FAILURE`].
    pub status: i32,
    /// Seconds between dispatch and receipt of the response headers.
    pub response_time: f64,
    pub params: Option<ParamSet>,
    pub headers: HeaderSet,
    pub error: Option<String>,
}

impl Outcome {
    pub fn response(
        status: u16,
        elapsed: Duration,
        params: Option<ParamSet>,
        headers: HeaderSet,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            status: i32::from(status),
            response_time: elapsed.as_secs_f64(),
            params,
            headers,
            error: None,
        }
    }

    pub fn failure(
        error: impl Into<String>,
        elapsed: Duration,
        params: Option<ParamSet>,
        headers: HeaderSet,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            status: TRANSPORT_FAILURE,
            response_time: elapsed.as_secs_f64(),
            params,
            headers,
            error: Some(error.into()),
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status == TRANSPORT_FAILURE
    }
}

/// Facts about a finished run that end up in the report header.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMetadata {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub duration_secs: u64,
    pub threads: usize,
}

/// Everything a run produced. Outcomes are in collector insertion order.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub metadata: RunMetadata,
    pub outcomes: Vec<Outcome>,
}
