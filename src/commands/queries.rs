use crate::commands::load_query;
use crate::config::{AppConfig, CreateQueryArgs, QueryToUrlArgs};
use crate::honeycomb::client::HoneycombClient;
use crate::honeycomb::urls;
use anyhow::Context;
use std::io::Write;
use tracing::info;

pub async fn create_query(
    args: CreateQueryArgs,
    config: &AppConfig,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let query = load_query(&args.source)?;
    let client = HoneycombClient::new(config)?;

    let id = client
        .create_query(&args.dataset, &query)
        .await
        .with_context(|| format!("Failed to create query in dataset {}", args.dataset))?;
    writeln!(out, "Created query :\n{}", id)?;
    Ok(())
}

pub fn query_to_url(args: QueryToUrlArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let query = load_query(&args.source)?;
    let url = urls::query_to_url(&query, &args.base_url, &args.dataset)
        .context("Failed to serialize query to JSON")?;
    writeln!(out, "Honeycomb URL:\n{}", url)?;

    if let Some(path) = &args.output {
        std::fs::write(path, &url)
            .with_context(|| format!("Failed to write URL to {}", path.display()))?;
        info!("Wrote URL to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuerySource;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn inline(query: &str) -> QuerySource {
        QuerySource {
            query: Some(query.to_string()),
            query_file: None,
        }
    }

    #[test]
    fn prints_and_writes_url() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("url.txt");
        let args = QueryToUrlArgs {
            dataset: "frontend".to_string(),
            base_url: "https://ui.honeycomb.io/acme/environments/prod".to_string(),
            output: Some(output.clone()),
            source: inline(r#"{"time_range": 7200, "breakdowns": ["name"]}"#),
        };

        let mut out = Vec::new();
        query_to_url(args, &mut out).unwrap();

        let expected = "https://ui.honeycomb.io/acme/environments/prod/datasets/frontend\
                        ?query={\"breakdowns\":[\"name\"],\"time_range\":7200}";
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("Honeycomb URL:\n{expected}\n")
        );
        assert_eq!(std::fs::read_to_string(&output).unwrap(), expected);
    }

    #[tokio::test]
    async fn creates_query_and_prints_id() {
        let honeycomb = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/queries/glider"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "q42"})),
            )
            .expect(1)
            .mount(&honeycomb)
            .await;

        let mut key = tempfile::NamedTempFile::new().unwrap();
        write!(key, "hc_key").unwrap();
        let config = AppConfig {
            honeycomb_api_url: honeycomb.uri(),
            honeycomb_api_key_file: key.path().to_string_lossy().into_owned(),
            ..Default::default()
        };
        let args = CreateQueryArgs {
            dataset: "glider".to_string(),
            source: inline(r#"{"calculations": [{"op": "COUNT"}]}"#),
        };

        let mut out = Vec::new();
        create_query(args, &config, &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Created query :\nq42\n");
    }

    #[tokio::test]
    async fn invalid_query_fails_before_any_request() {
        let honeycomb = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&honeycomb)
            .await;

        let config = AppConfig {
            honeycomb_api_url: honeycomb.uri(),
            ..Default::default()
        };
        let args = CreateQueryArgs {
            dataset: "glider".to_string(),
            source: inline("not json"),
        };

        let mut out = Vec::new();
        assert!(create_query(args, &config, &mut out).await.is_err());
    }
}
