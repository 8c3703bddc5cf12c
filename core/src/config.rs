use crate::errors::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Number of fragments requested from the knowledge base when unset
pub const DEFAULT_RESULT_COUNT: usize = 5;

pub const DEFAULT_REGION: &str = "us-west-2";

pub const DEFAULT_EMBEDDING_MODEL_ID: &str = "amazon.titan-embed-text-v2:0";

/// Configuration for the managed services and the request pipeline
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct KbqaConfig {
    pub region: Option<String>,
    pub knowledge_base_id: Option<String>,
    /// Model used by retrieve-and-generate
    pub model_arn: Option<String>,
    pub inference_model_id: Option<String>,
    pub embedding_model_id: Option<String>,
    pub dynamodb_table: Option<String>,
    /// Endpoint overrides, e.g. a signing proxy or a local emulator
    pub agent_endpoint: Option<String>,
    pub runtime_endpoint: Option<String>,
    pub dynamodb_endpoint: Option<String>,
    pub bearer_token: Option<String>,
    pub result_count: Option<usize>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub prompt_template_path: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
}

impl Default for KbqaConfig {
    fn default() -> Self {
        Self {
            region: Some(DEFAULT_REGION.to_string()),
            knowledge_base_id: None,
            model_arn: None,
            inference_model_id: None,
            embedding_model_id: Some(DEFAULT_EMBEDDING_MODEL_ID.to_string()),
            dynamodb_table: None,
            agent_endpoint: None,
            runtime_endpoint: None,
            dynamodb_endpoint: None,
            bearer_token: None,
            result_count: Some(DEFAULT_RESULT_COUNT),
            max_tokens: Some(1024),
            temperature: None,
            prompt_template_path: None,
            request_timeout_secs: Some(60),
        }
    }
}

impl KbqaConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> ServiceResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                ServiceError::ConfigError(format!("Failed to read config file: {}", e))
            })?;

            let config: Self = toml::from_str(&content).map_err(|e| {
                ServiceError::ConfigError(format!("Failed to parse config file: {}", e))
            })?;

            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Reads the process environment, after loading a `.env` file if one is present.
    ///
    /// Only variables that are set produce values; everything else stays `None`
    /// so the result can be merged over a file-based config.
    pub fn from_env() -> ServiceResult<Self> {
        // A missing .env file is the normal case in deployed environments
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> ServiceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let result_count = match get("KBQA_RESULT_COUNT") {
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|e| {
                ServiceError::ConfigError(format!("Invalid KBQA_RESULT_COUNT '{}': {}", raw, e))
            })?),
            None => None,
        };

        Ok(Self {
            region: get("AWS_REGION").or_else(|| get("AWS_DEFAULT_REGION")),
            knowledge_base_id: get("KNOWLEDGE_BASE_ID"),
            model_arn: get("MODEL_ARN"),
            inference_model_id: get("INFERENCE_MODEL_ID"),
            embedding_model_id: get("EMBEDDING_MODEL_ID"),
            dynamodb_table: get("DYNAMODB_TABLE"),
            agent_endpoint: get("BEDROCK_AGENT_ENDPOINT"),
            runtime_endpoint: get("BEDROCK_RUNTIME_ENDPOINT"),
            dynamodb_endpoint: get("DYNAMODB_ENDPOINT"),
            bearer_token: get("AWS_BEARER_TOKEN_BEDROCK"),
            result_count,
            max_tokens: None,
            temperature: None,
            prompt_template_path: get("KBQA_PROMPT_TEMPLATE").map(PathBuf::from),
            request_timeout_secs: None,
        })
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            region: other.region.clone().or_else(|| self.region.clone()),
            knowledge_base_id: other
                .knowledge_base_id
                .clone()
                .or_else(|| self.knowledge_base_id.clone()),
            model_arn: other.model_arn.clone().or_else(|| self.model_arn.clone()),
            inference_model_id: other
                .inference_model_id
                .clone()
                .or_else(|| self.inference_model_id.clone()),
            embedding_model_id: other
                .embedding_model_id
                .clone()
                .or_else(|| self.embedding_model_id.clone()),
            dynamodb_table: other
                .dynamodb_table
                .clone()
                .or_else(|| self.dynamodb_table.clone()),
            agent_endpoint: other
                .agent_endpoint
                .clone()
                .or_else(|| self.agent_endpoint.clone()),
            runtime_endpoint: other
                .runtime_endpoint
                .clone()
                .or_else(|| self.runtime_endpoint.clone()),
            dynamodb_endpoint: other
                .dynamodb_endpoint
                .clone()
                .or_else(|| self.dynamodb_endpoint.clone()),
            bearer_token: other
                .bearer_token
                .clone()
                .or_else(|| self.bearer_token.clone()),
            result_count: other.result_count.or(self.result_count),
            max_tokens: other.max_tokens.or(self.max_tokens),
            temperature: other.temperature.or(self.temperature),
            prompt_template_path: other
                .prompt_template_path
                .clone()
                .or_else(|| self.prompt_template_path.clone()),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
        }
    }

    /// Defaults, then the config file, then the environment
    pub fn load(path: Option<&Path>) -> ServiceResult<Self> {
        let file_config = match path {
            Some(path) => Self::load_from_file(path)?,
            // No home directory (e.g. a bare container) means no user config file
            None => match get_default_config_file("kbqa") {
                Ok(path) => Self::load_from_file(&path)?,
                Err(_) => Self::default(),
            },
        };
        let env_config = Self::from_env()?;

        Ok(Self::default().merge(&file_config).merge(&env_config))
    }

    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    pub fn result_count(&self) -> usize {
        self.result_count.unwrap_or(DEFAULT_RESULT_COUNT)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(60))
    }

    pub fn agent_endpoint(&self) -> String {
        endpoint_or_default(
            &self.agent_endpoint,
            format!("https://bedrock-agent-runtime.{}.amazonaws.com", self.region()),
        )
    }

    pub fn runtime_endpoint(&self) -> String {
        endpoint_or_default(
            &self.runtime_endpoint,
            format!("https://bedrock-runtime.{}.amazonaws.com", self.region()),
        )
    }

    pub fn dynamodb_endpoint(&self) -> String {
        endpoint_or_default(
            &self.dynamodb_endpoint,
            format!("https://dynamodb.{}.amazonaws.com", self.region()),
        )
    }

    /// Returns a configured value or a `ConfigError` naming the missing setting
    pub fn require<'a>(value: &'a Option<String>, name: &str) -> ServiceResult<&'a str> {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServiceError::ConfigError(format!("{} is not configured", name)))
    }
}

fn endpoint_or_default(configured: &Option<String>, default: String) -> String {
    configured
        .as_deref()
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or(default)
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> ServiceResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        ServiceError::ConfigError("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> ServiceResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}
