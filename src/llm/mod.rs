pub mod models;
pub mod providers;

use crate::config::{AppConfig, ConfigurationError};
use crate::util::secrets::SecretError;
use async_trait::async_trait;
use models::QueryInput;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("translator configuration error")]
    Config(#[from] ConfigurationError),
    #[error("failed to read model credentials")]
    Secret(#[from] SecretError),
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
    #[error("failed to deserialize response body: {body}")]
    Decode {
        body: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("prediction {id} ended with status {status}: {error}")]
    PredictionFailed {
        id: String,
        status: String,
        error: serde_json::Value,
    },
    #[error("prediction {0} did not finish before the deadline")]
    Timeout(String),
    #[error("model output is not a string: {0}")]
    UnexpectedOutput(serde_json::Value),
}

/// Result of a translation that reached the model.
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    /// The query string exactly as the model produced it
    Query(String),
    /// The model answered without an output; `diagnostic` is whatever error it reported
    Empty {
        diagnostic: Option<serde_json::Value>,
    },
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, input: &QueryInput) -> Result<Translation, TranslationError>;
}

/// Holds the translator picked for this invocation. The choice is made once;
/// a failing backend never falls back to the other.
pub struct QueryTranslator {
    backend: &'static str,
    translator: Box<dyn Translator + Send + Sync>,
}

impl QueryTranslator {
    pub fn new(config: &AppConfig) -> Result<Self, TranslationError> {
        let timeout = config.timeout();
        let (backend, translator): (&'static str, Box<dyn Translator + Send + Sync>) =
            match &config.replicate {
                Some(replicate) => (
                    "replicate",
                    Box::new(providers::replicate::HostedModelTranslator::new(
                        replicate, timeout,
                    )?),
                ),
                None => (
                    "direct",
                    Box::new(providers::direct::DirectModelTranslator::new(
                        config.ai_endpoint()?,
                        timeout,
                    )?),
                ),
            };

        Ok(Self {
            backend,
            translator,
        })
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub async fn translate(&self, input: &QueryInput) -> Result<Translation, TranslationError> {
        self.translator.translate(input).await
    }
}
