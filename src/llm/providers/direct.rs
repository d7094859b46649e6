use crate::llm::models::{PredictionEnvelope, PredictionRequest, QueryInput};
use crate::llm::{Translation, TranslationError, Translator};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Translator backed by a model server we run ourselves (e.g. a cog container),
/// reached through its `/predictions` endpoint.
pub struct DirectModelTranslator {
    client: reqwest::Client,
    endpoint: String,
}

impl DirectModelTranslator {
    pub fn new(ai_endpoint: &str, timeout: Duration) -> Result<Self, TranslationError> {
        let endpoint = format!("{}/predictions", ai_endpoint.trim_end_matches('/'));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslationError::Connection {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        Ok(Self { client, endpoint })
    }

    /// Runs one prediction and returns the decoded envelope.
    pub async fn predict(&self, input: &QueryInput) -> Result<PredictionEnvelope, TranslationError> {
        let request = PredictionRequest { input };
        info!("Sending prediction request to {}", self.endpoint);
        debug!("Prediction input: {:?}", input);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| TranslationError::Connection {
                endpoint: self.endpoint.clone(),
                source: e,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| TranslationError::Connection {
            endpoint: self.endpoint.clone(),
            source: e,
        })?;

        if status != StatusCode::OK {
            error!("Prediction request failed with status {} - body: {}", status, body);
            return Err(TranslationError::Status { status, body });
        }

        debug!("Raw prediction response: {}", body);
        serde_json::from_str::<PredictionEnvelope>(&body)
            .map_err(|source| TranslationError::Decode { body, source })
    }
}

#[async_trait]
impl Translator for DirectModelTranslator {
    async fn translate(&self, input: &QueryInput) -> Result<Translation, TranslationError> {
        let envelope = self.predict(input).await?;

        match envelope.output {
            Some(output) => {
                info!(
                    "Received query from model in {:.3}s",
                    envelope.metrics.predict_time_seconds
                );
                Ok(Translation::Query(output))
            }
            None => {
                let id = envelope.id.as_deref().unwrap_or("<unknown>");
                if envelope.failed() {
                    warn!("Prediction {} failed: {:?}", id, envelope.error);
                } else {
                    warn!("Prediction {} returned no output", id);
                }
                Ok(Translation::Empty {
                    diagnostic: envelope.error,
                })
            }
        }
    }
}
