pub mod client;
pub mod query;
pub mod urls;

use crate::config::ConfigurationError;
use crate::util::secrets::SecretError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HoneycombError {
    #[error("honeycomb configuration error")]
    Config(#[from] ConfigurationError),
    #[error("failed to read honeycomb API key")]
    ApiKey(#[from] SecretError),
    #[error("failed to send request to {endpoint}")]
    Connection {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request failed with status code {status}; body {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to serialize query")]
    Encode(#[source] serde_json::Error),
    #[error("failed to deserialize response body: {body}")]
    Decode {
        body: String,
        #[source]
        source: serde_json::Error,
    },
}
