//! Data models for the URL aggregator.
//!
//! This module contains the per-URL outcome record, the aggregated
//! response delivered to the caller, and the request/response bodies
//! exchanged with HTTP clients of the entry point.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Outcome of a single URL request.
///
/// Serialized as `{"body": any|null, "status": int, "duration": int}` with an
/// additional `"error"` field only when the request failed at the transport level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    /// Position of the URL in the request.
    #[serde(skip)]
    pub index: usize,
    /// Response payload; absent on transport failure.
    #[serde(serialize_with = "serialize_body")]
    pub body: Option<String>,
    /// HTTP status code, or [`ResultRecord::FAILED_STATUS`] on transport failure.
    pub status: i32,
    /// Time from dispatch to settlement in milliseconds.
    #[serde(rename = "duration")]
    pub duration_millis: u64,
    /// Failure description; absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultRecord {
    /// Status sentinel used for transport failures.
    pub const FAILED_STATUS: i32 = -1;

    /// Creates a record for a received response (any HTTP status).
    pub fn success(index: usize, status: u16, body: String, duration_millis: u64) -> Self {
        Self {
            index,
            body: Some(body),
            status: i32::from(status),
            duration_millis,
            error: None,
        }
    }

    /// Creates a record for a transport-level failure.
    pub fn failure(index: usize, error: String, duration_millis: u64) -> Self {
        Self {
            index,
            body: None,
            status: Self::FAILED_STATUS,
            duration_millis,
            error: Some(error),
        }
    }

    /// Placeholder for a slot that was never written.
    pub fn unsettled(index: usize) -> Self {
        Self::failure(index, "request never settled".to_string(), 0)
    }

    /// Returns true if the request failed before a response was received.
    pub fn is_failure(&self) -> bool {
        self.status == Self::FAILED_STATUS
    }
}

/// Emit the body as parsed JSON when possible, otherwise as a JSON string.
///
/// A payload of literal `null` stays a string so that `null` only ever
/// marks a transport failure.
fn serialize_body<S>(body: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match body {
        None => serializer.serialize_none(),
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Null) | Err(_) => serializer.serialize_str(raw),
            Ok(json) => json.serialize(serializer),
        },
    }
}

/// The aggregated result of one fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateResponse {
    /// Per-URL records, ordered as the input URLs.
    pub responses: Vec<ResultRecord>,
    /// Time from task start to finalization in milliseconds.
    #[serde(rename = "duration")]
    pub total_duration_millis: u64,
}

impl AggregateResponse {
    /// Number of records that received an HTTP response.
    pub fn succeeded(&self) -> usize {
        self.responses.iter().filter(|r| !r.is_failure()).count()
    }

    /// Number of records that failed at the transport level.
    pub fn failed(&self) -> usize {
        self.responses.iter().filter(|r| r.is_failure()).count()
    }

    /// Duration of the slowest individual request.
    pub fn slowest_millis(&self) -> u64 {
        self.responses
            .iter()
            .map(|r| r.duration_millis)
            .max()
            .unwrap_or(0)
    }
}

/// Request body accepted by `POST /aggregate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiRequest {
    /// URLs to fetch, in the order their results should be reported.
    #[serde(default)]
    pub urls: Vec<String>,
}

/// Response body of the `/time` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeResponse {
    pub time: String,
}

impl TimeResponse {
    /// Current local time in ISO-8601 form without offset.
    pub fn now() -> Self {
        Self {
            time: chrono::Local::now()
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        }
    }
}
