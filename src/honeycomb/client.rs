use crate::config::AppConfig;
use crate::honeycomb::query::{AnalyticsQuery, HoneycombColumn};
use crate::honeycomb::HoneycombError;
use crate::util::secrets::read_secret;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info};

const API_KEY_HEADER: &str = "X-Honeycomb-Team";

/// Client for the Honeycomb REST API. Holds only the trimmed API key.
pub struct HoneycombClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HoneycombClient {
    pub fn new(config: &AppConfig) -> Result<Self, HoneycombError> {
        Self::from_key_file(
            config.honeycomb_api_key_file()?,
            &config.honeycomb_api_url,
            config.timeout(),
        )
    }

    /// Reads the API key from `key_file`; an empty key fails before anything is sent.
    pub fn from_key_file(
        key_file: &str,
        api_url: &str,
        timeout: Duration,
    ) -> Result<Self, HoneycombError> {
        let api_key = read_secret(key_file)?;
        let api_url = api_url.trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HoneycombError::Connection {
                endpoint: api_url.clone(),
                source: e,
            })?;

        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }

    /// Lists the columns of a dataset in the order the API returns them.
    pub async fn get_columns(&self, dataset: &str) -> Result<Vec<HoneycombColumn>, HoneycombError> {
        let endpoint = format!("{}/1/columns/{}", self.api_url, dataset);
        info!("Fetching columns from {}", endpoint);

        let request = self
            .client
            .get(&endpoint)
            .header(API_KEY_HEADER, &self.api_key);
        let body = self.send(&endpoint, request).await?;
        decode(body)
    }

    /// Creates a query in `dataset` and returns its id. Some deployments omit the id,
    /// in which case the result is empty.
    pub async fn create_query(
        &self,
        dataset: &str,
        query: &AnalyticsQuery,
    ) -> Result<String, HoneycombError> {
        let endpoint = format!("{}/1/queries/{}", self.api_url, dataset);
        let payload = serde_json::to_string(query).map_err(HoneycombError::Encode)?;
        info!("Creating query at {}", endpoint);
        debug!("Query: {}", payload);

        let request = self
            .client
            .post(&endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload);
        let body = self.send(&endpoint, request).await?;

        let created: AnalyticsQuery = decode(body)?;
        Ok(created.id.unwrap_or_default())
    }

    async fn send(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<String, HoneycombError> {
        let connection_err = |source| HoneycombError::Connection {
            endpoint: endpoint.to_string(),
            source,
        };

        let response = request.send().await.map_err(connection_err)?;
        let status = response.status();
        let body = response.text().await.map_err(connection_err)?;

        if status != StatusCode::OK {
            error!("Request to {} failed with status {} - body: {}", endpoint, status, body);
            return Err(HoneycombError::Status { status, body });
        }
        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(body: String) -> Result<T, HoneycombError> {
    serde_json::from_str(&body).map_err(|source| HoneycombError::Decode { body, source })
}
