use chrono::{DateTime, FixedOffset};
use crate::util::json::null_as_default;
use serde::{Deserialize, Serialize};

// Input for translating a natural language query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryInput {
    #[serde(rename = "nlq")]
    pub natural_language_query: String,
    /// JSON encoded list of column descriptors
    #[serde(rename = "cols")]
    pub columns_json: String,
}

// Request body sent to the model server
#[derive(Debug, Serialize)]
pub struct PredictionRequest<'a> {
    pub input: &'a QueryInput,
}

/// A single inference job as reported by the model server.
///
/// Absent and empty are kept apart: a missing `logs` decodes to `None` while
/// `"logs": ""` decodes to `Some("")`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<QueryInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    // Shape is up to the model server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metrics: Metrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub webhook_events_filter: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(rename = "predict_time", default, deserialize_with = "null_as_default")]
    pub predict_time_seconds: f64,
}

impl PredictionEnvelope {
    pub fn failed(&self) -> bool {
        matches!(self.status.as_deref(), Some("failed") | Some("canceled"))
    }
}
