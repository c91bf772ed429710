use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The uniform terminal response wrapper every endpoint returns.
///
/// Success and failure share the same shape, so clients can always read
/// `success`, `data`/`err_message` and `trace_id` without branching on the
/// HTTP status class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    /// RFC3339 wall-clock time the response was armed.
    pub time: String,
    pub trace_id: String,
    /// Milliseconds between context creation and the arming call.
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Paging values decoded from the query string and echoed back inside the
/// envelope. Stands in for the persistence layer's paging type; absent or
/// malformed values decode to zero and are the handler's to validate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Sort selector decoded from the query string (`sort_by`, `descending`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sorting {
    #[serde(default)]
    pub sort_by: String,
    #[serde(default)]
    pub descending: bool,
}
