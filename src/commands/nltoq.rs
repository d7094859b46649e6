use crate::config::{AppConfig, NlToQueryArgs};
use crate::honeycomb::client::HoneycombClient;
use crate::llm::models::QueryInput;
use crate::llm::{QueryTranslator, Translation};
use anyhow::{anyhow, Context};
use std::io::Write;
use tracing::info;

pub async fn run(args: NlToQueryArgs, config: &AppConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    let translator = QueryTranslator::new(config).context("Failed to set up the translator")?;
    info!("Using {} translator", translator.backend());

    let columns_json = match args.cols {
        Some(cols) => cols,
        None => {
            let dataset = args
                .dataset
                .as_deref()
                .ok_or_else(|| anyhow!("dataset must be specified if cols isn't specified"))?;
            fetch_columns(config, dataset).await?
        }
    };

    let input = QueryInput {
        natural_language_query: args.nlq,
        columns_json,
    };

    match translator.translate(&input).await? {
        Translation::Query(query) => {
            writeln!(out, "The query is:\n{}", query)?;
            // Lets the query be pasted on the command line inside single quotes
            writeln!(out, "Escaped query :\n{}", query.replace('\'', "\""))?;

            if let Some(path) = &args.output {
                std::fs::write(path, &query)
                    .with_context(|| format!("Failed to write query to {}", path.display()))?;
                writeln!(out, "Wrote query to {}", path.display())?;
            }
        }
        Translation::Empty { diagnostic } => {
            let diagnostic = diagnostic
                .map(|d| d.to_string())
                .unwrap_or_else(|| "the model did not report an error".to_string());
            writeln!(out, "No query was returned:\n{}", diagnostic)?;
        }
    }

    Ok(())
}

async fn fetch_columns(config: &AppConfig, dataset: &str) -> anyhow::Result<String> {
    info!("No columns specified; fetching columns from Honeycomb");
    let client = HoneycombClient::new(config)?;
    let columns = client
        .get_columns(dataset)
        .await
        .with_context(|| format!("Failed to fetch columns for dataset {}", dataset))?;

    let names: Vec<&str> = columns.iter().map(|c| c.key_name.as_str()).collect();
    info!(?names, "Fetched list of columns");

    serde_json::to_string(&columns).context("Failed to serialize columns")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn args(cols: Option<&str>, dataset: Option<&str>) -> NlToQueryArgs {
        NlToQueryArgs {
            nlq: "slowest traces".to_string(),
            cols: cols.map(str::to_string),
            dataset: dataset.map(str::to_string),
            output: None,
        }
    }

    #[tokio::test]
    async fn prints_query_and_writes_output_file() {
        let model = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predictions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "output": "{'breakdowns': ['http.route']}",
                "status": "succeeded"
            })))
            .mount(&model)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("query.txt");
        let config = AppConfig {
            ai_endpoint: model.uri(),
            ..Default::default()
        };
        let mut args = args(Some(r#"["http.route"]"#), None);
        args.output = Some(output.clone());

        let mut out = Vec::new();
        run(args, &config, &mut out).await.unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("The query is:\n{'breakdowns': ['http.route']}\n"));
        assert!(printed.contains("Escaped query :\n{\"breakdowns\": [\"http.route\"]}\n"));
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "{'breakdowns': ['http.route']}"
        );
    }

    #[tokio::test]
    async fn empty_result_surfaces_model_error() {
        let model = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predictions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "failed",
                "error": "prediction interrupted"
            })))
            .mount(&model)
            .await;

        let config = AppConfig {
            ai_endpoint: model.uri(),
            ..Default::default()
        };
        let mut out = Vec::new();
        run(args(Some("[]"), None), &config, &mut out).await.unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed, "No query was returned:\n\"prediction interrupted\"\n");
    }

    #[tokio::test]
    async fn fetches_columns_when_not_given() {
        let honeycomb = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/columns/glider"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "1", "key_name": "duration_ms", "type": "float"}
            ])))
            .expect(1)
            .mount(&honeycomb)
            .await;

        let model = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predictions"))
            .and(body_partial_json(serde_json::json!({"input": {"nlq": "slowest traces"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "output": "{}"
            })))
            .expect(1)
            .mount(&model)
            .await;

        let mut key = tempfile::NamedTempFile::new().unwrap();
        write!(key, "hc_key").unwrap();
        let config = AppConfig {
            ai_endpoint: model.uri(),
            honeycomb_api_url: honeycomb.uri(),
            honeycomb_api_key_file: key.path().to_string_lossy().into_owned(),
            ..Default::default()
        };

        let mut out = Vec::new();
        run(args(None, Some("glider")), &config, &mut out).await.unwrap();

        let requests = model.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let cols: Vec<serde_json::Value> =
            serde_json::from_str(body["input"]["cols"].as_str().unwrap()).unwrap();
        assert_eq!(cols[0]["key_name"], "duration_ms");
    }

    #[tokio::test]
    async fn requires_dataset_without_cols() {
        let config = AppConfig {
            ai_endpoint: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let mut out = Vec::new();
        let err = run(args(None, None), &config, &mut out).await.unwrap_err();
        assert!(err.to_string().contains("dataset must be specified"));
    }
}
