use clap::{Args, Parser, Subcommand};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const CONFIG_DIR: &str = ".hccli";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_HONEYCOMB_API_URL: &str = "https://api.honeycomb.io";

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to load configuration")]
    Load(#[from] config::ConfigError),
    #[error("{0} is not set; set it by running:\n\thccli config set {0}=<value>")]
    Missing(&'static str),
    #[error("unknown configuration key {0}")]
    UnknownKey(String),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error("argument {0:?} is not in the form <name>=<value>")]
    InvalidAssignment(String),
    #[error("failed to serialize configuration")]
    Serialize(#[from] serde_yaml::Error),
    #[error("failed to write configuration to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ReplicateConfig {
    /// Path or file:// URI of the Replicate API token
    pub api_token_file: String,
    /// Model identifier, `owner/name` or `owner/name:version`
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api_version: String,
    pub kind: String,
    /// Endpoint of the model server that turns natural language into queries
    pub ai_endpoint: String,
    /// Path or file:// URI of the Honeycomb API key
    pub honeycomb_api_key_file: String,
    /// Base URL of the Honeycomb API, e.g. https://api.eu1.honeycomb.io for the EU region
    pub honeycomb_api_url: String,
    pub timeout_seconds: u64,
    /// When present the hosted model on Replicate is used instead of `ai_endpoint`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicate: Option<ReplicateConfig>,
    pub logging: LoggingConfig,

    /// File the configuration was loaded from and is written back to
    #[serde(skip)]
    pub config_file: PathBuf,
}

#[derive(Parser, Debug)]
#[command(name = "hccli", author, version, about = "Turn natural language into Honeycomb queries", long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (default is $HOME/.hccli/config.yaml)
    #[arg(long, value_name = "FILE", env = "HCCLI_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// The logging level
    #[arg(long, global = true)]
    pub level: Option<String>,

    /// Enable json logging
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Translate a natural language query into a Honeycomb query
    #[command(name = "nltoq")]
    NlToQuery(NlToQueryArgs),

    /// Create a query in Honeycomb and print its id
    #[command(name = "createquery")]
    CreateQuery(CreateQueryArgs),

    /// Turn a query into a Honeycomb URL
    #[command(name = "querytourl")]
    QueryToUrl(QueryToUrlArgs),

    /// Get or set configuration values
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
pub struct NlToQueryArgs {
    /// Natural language query
    #[arg(long)]
    pub nlq: String,

    /// Columns as a JSON list
    #[arg(long)]
    pub cols: Option<String>,

    /// Honeycomb dataset to fetch columns for. Only required if cols isn't specified
    #[arg(long)]
    pub dataset: Option<String>,

    /// Output file to write the query to
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct QuerySource {
    /// The honeycomb query
    #[arg(long)]
    pub query: Option<String>,

    /// A file containing the honeycomb query
    #[arg(long, value_name = "FILE")]
    pub query_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CreateQueryArgs {
    /// The dataset slug to create the query in
    #[arg(long)]
    pub dataset: String,

    #[command(flatten)]
    pub source: QuerySource,
}

#[derive(Args, Debug)]
pub struct QueryToUrlArgs {
    /// The dataset slug the query runs against
    #[arg(long)]
    pub dataset: String,

    /// The base URL for your honeycomb URLs, e.g. https://ui.honeycomb.io/${ORG}/environments/${ENVIRONMENT}
    #[arg(long)]
    pub base_url: String,

    /// Output file to write the URL to
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub source: QuerySource,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the configuration
    Get,
    /// Set a value, e.g. `hccli config set ai_endpoint=http://localhost:8080`
    Set {
        #[arg(value_name = "NAME=VALUE")]
        assignment: String,
    },
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigurationError> {
        let config_file = args.config.clone().unwrap_or_else(default_config_file);
        let mut config = Self::load(&config_file)?;

        if let Some(level) = &args.level {
            config.logging.level = level.clone();
        }

        Ok(config)
    }

    /// Layers the config file (if it exists) and `HCCLI_*` environment variables,
    /// e.g. `HCCLI_AI_ENDPOINT` or `HCCLI_REPLICATE__MODEL`.
    pub fn load(config_file: &Path) -> Result<Self, ConfigurationError> {
        let config_builder = Config::builder()
            .add_source(File::from(config_file).required(false))
            .add_source(
                Environment::with_prefix("HCCLI")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;
        config.config_file = config_file.to_path_buf();
        Ok(config)
    }

    pub fn log_level(&self) -> Result<&str, ConfigurationError> {
        let level = if self.logging.level.is_empty() {
            "info"
        } else {
            self.logging.level.as_str()
        };
        level
            .parse::<tracing::Level>()
            .map_err(|_| ConfigurationError::InvalidValue {
                key: "logging.level".to_string(),
                value: level.to_string(),
            })?;
        Ok(level)
    }

    pub fn honeycomb_api_key_file(&self) -> Result<&str, ConfigurationError> {
        non_empty(&self.honeycomb_api_key_file, "honeycomb_api_key_file")
    }

    pub fn ai_endpoint(&self) -> Result<&str, ConfigurationError> {
        non_empty(&self.ai_endpoint, "ai_endpoint")
    }

    pub fn timeout(&self) -> std::time::Duration {
        let secs = if self.timeout_seconds == 0 {
            DEFAULT_TIMEOUT_SECONDS
        } else {
            self.timeout_seconds
        };
        std::time::Duration::from_secs(secs)
    }

    /// Applies a `<name>=<value>` assignment to a known key.
    pub fn set(&mut self, assignment: &str) -> Result<(), ConfigurationError> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| ConfigurationError::InvalidAssignment(assignment.to_string()))?;
        let value = value.to_string();

        match key {
            "api_version" => self.api_version = value,
            "kind" => self.kind = value,
            "ai_endpoint" => self.ai_endpoint = value,
            "honeycomb_api_key_file" => self.honeycomb_api_key_file = value,
            "honeycomb_api_url" => self.honeycomb_api_url = value,
            "timeout_seconds" => {
                self.timeout_seconds =
                    value
                        .parse()
                        .map_err(|_| ConfigurationError::InvalidValue {
                            key: key.to_string(),
                            value: value.clone(),
                        })?
            }
            "logging.level" => self.logging.level = value,
            "replicate.api_token_file" => {
                self.replicate.get_or_insert_with(Default::default).api_token_file = value
            }
            "replicate.model" => self.replicate.get_or_insert_with(Default::default).model = value,
            "replicate.base_url" => {
                self.replicate.get_or_insert_with(Default::default).base_url = Some(value)
            }
            _ => return Err(ConfigurationError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String, ConfigurationError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Writes the configuration to `path`, creating its directory if needed.
    pub fn write(&self, path: &Path) -> Result<(), ConfigurationError> {
        let write_err = |source| ConfigurationError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                info!("Creating config directory {}", dir.display());
                create_private_dir(dir).map_err(write_err)?;
            }
        }

        std::fs::write(path, self.to_yaml()?).map_err(write_err)
    }
}

fn non_empty<'a>(value: &'a str, key: &'static str) -> Result<&'a str, ConfigurationError> {
    if value.trim().is_empty() {
        Err(ConfigurationError::Missing(key))
    } else {
        Ok(value)
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

pub fn default_config_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CONFIG_DIR)
        .join("config.yaml")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_version: "hccli.io/v1alpha1".to_string(),
            kind: "Config".to_string(),
            ai_endpoint: String::new(),
            honeycomb_api_key_file: String::new(),
            honeycomb_api_url: DEFAULT_HONEYCOMB_API_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            replicate: None,
            logging: LoggingConfig::default(),
            config_file: default_config_file(),
        }
    }
}
