use crate::config::{ConfigurationError, ReplicateConfig};
use crate::llm::models::QueryInput;
use crate::llm::{Translation, TranslationError, Translator};
use crate::util::secrets::read_secret;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";

const POLL_INTERVAL: Duration = Duration::from_millis(500);

// Replicate accepts waits of 1 to 60 seconds.
const MAX_SERVER_WAIT_SECONDS: u64 = 60;

/// Client for Replicate's managed inference API.
pub struct ReplicateClient {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct CreatePrediction<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    input: serde_json::Value,
}

#[derive(Deserialize, Debug)]
struct Prediction {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    output: serde_json::Value,
    #[serde(default)]
    error: serde_json::Value,
    #[serde(default)]
    urls: PredictionUrls,
}

#[derive(Deserialize, Debug, Default)]
struct PredictionUrls {
    #[serde(default)]
    get: Option<String>,
}

impl Prediction {
    fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed" | "canceled")
    }
}

impl ReplicateClient {
    pub fn new(base_url: &str, api_token: String, timeout: Duration) -> Result<Self, TranslationError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslationError::Connection {
                endpoint: base_url.clone(),
                source: e,
            })?;

        Ok(Self {
            client,
            base_url,
            api_token,
            timeout,
        })
    }

    /// Runs `model` with `input` and waits for the prediction to finish.
    /// `model` is either `owner/name` or `owner/name:version`.
    pub async fn run(
        &self,
        model: &str,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, TranslationError> {
        let deadline = Instant::now() + self.timeout;

        let (endpoint, request) = match model.split_once(':') {
            Some((_, version)) => (
                format!("{}/predictions", self.base_url),
                CreatePrediction {
                    version: Some(version),
                    input,
                },
            ),
            None => (
                format!("{}/models/{}/predictions", self.base_url, model),
                CreatePrediction {
                    version: None,
                    input,
                },
            ),
        };

        info!("Creating prediction for model {}", model);
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_token)
            .header("Prefer", prefer_wait(self.timeout))
            .json(&request)
            .send()
            .await
            .map_err(|e| TranslationError::Connection {
                endpoint: endpoint.clone(),
                source: e,
            })?;
        let mut prediction = self.decode(endpoint, response).await?;

        while !prediction.is_terminal() {
            let Some(get_url) = prediction.urls.get.clone() else {
                return Err(TranslationError::PredictionFailed {
                    id: prediction.id,
                    status: prediction.status,
                    error: serde_json::Value::String("no URL to poll for the result".to_string()),
                });
            };
            if Instant::now() + POLL_INTERVAL > deadline {
                return Err(TranslationError::Timeout(prediction.id));
            }
            tokio::time::sleep(POLL_INTERVAL).await;

            debug!("Polling prediction {} (status {})", prediction.id, prediction.status);
            let response = self
                .client
                .get(&get_url)
                .bearer_auth(&self.api_token)
                .send()
                .await
                .map_err(|e| TranslationError::Connection {
                    endpoint: get_url.clone(),
                    source: e,
                })?;
            prediction = self.decode(get_url, response).await?;
        }

        if prediction.status != "succeeded" {
            error!("Prediction {} {}: {}", prediction.id, prediction.status, prediction.error);
            return Err(TranslationError::PredictionFailed {
                id: prediction.id,
                status: prediction.status,
                error: prediction.error,
            });
        }

        Ok(prediction.output)
    }

    async fn decode(
        &self,
        endpoint: String,
        response: reqwest::Response,
    ) -> Result<Prediction, TranslationError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TranslationError::Connection { endpoint, source: e })?;

        if !status.is_success() {
            error!("Replicate responded with status {} - body: {}", status, body);
            return Err(TranslationError::Status { status, body });
        }

        serde_json::from_str(&body).map_err(|source| TranslationError::Decode { body, source })
    }
}

/// `Prefer` value holding the server for half of the request timeout.
fn prefer_wait(timeout: Duration) -> String {
    let seconds = (timeout.as_secs() / 2).clamp(1, MAX_SERVER_WAIT_SECONDS);
    format!("wait={seconds}")
}

/// Translator backed by the model deployed on Replicate.
pub struct HostedModelTranslator {
    client: ReplicateClient,
    model: String,
}

impl HostedModelTranslator {
    pub fn new(config: &ReplicateConfig, timeout: Duration) -> Result<Self, TranslationError> {
        if config.api_token_file.trim().is_empty() {
            return Err(ConfigurationError::Missing("replicate.api_token_file").into());
        }
        if config.model.trim().is_empty() {
            return Err(ConfigurationError::Missing("replicate.model").into());
        }

        let api_token = read_secret(&config.api_token_file)?;
        let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);

        Ok(Self {
            client: ReplicateClient::new(base_url, api_token, timeout)?,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Translator for HostedModelTranslator {
    async fn translate(&self, input: &QueryInput) -> Result<Translation, TranslationError> {
        let model_input = serde_json::json!({
            "nlq": input.natural_language_query,
            "cols": input.columns_json,
        });

        info!("Sending prediction to Replicate");
        debug!("Prediction input: {:?}", input);
        let output = self.client.run(&self.model, model_input).await?;
        info!("Received query from Replicate");

        match output {
            serde_json::Value::String(query) => Ok(Translation::Query(query)),
            other => Err(TranslationError::UnexpectedOutput(other)),
        }
    }
}
