use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Supported backends for the conversational model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenAI,
}

impl Provider {
    /// Base URL of the provider's OpenAI-compatible endpoint.
    pub fn api_base(&self) -> &'static str {
        match self {
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
            Provider::OpenAI => "https://api.openai.com/v1/",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-1.5-flash",
            Provider::OpenAI => "gpt-4o",
        }
    }
}

/// Where user documents live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub provider: Provider,
    pub model_api_key: String,
    pub chat_model: String,
    pub oracle_timeout: Duration,
    pub ifttt_webhook_key: Option<String>,
    pub ifttt_base_url: Option<String>,
    pub sos_event_name: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let store_str = std::env::var("USER_STORE").unwrap_or_else(|_| "postgres".to_string());
        let store_backend = match store_str.to_lowercase().as_str() {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "USER_STORE".to_string(),
                    format!("'{}' is not one of 'postgres', 'memory'", other),
                ));
            }
        };

        let database_url = std::env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingVar("DATABASE_URL".to_string()));
        }

        let provider_str = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "gemini".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "gemini" => Provider::Gemini,
            "openai" => Provider::OpenAI,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LLM_PROVIDER".to_string(),
                    format!("'{}' is not one of 'gemini', 'openai'", other),
                ));
            }
        };

        let key_var = match provider {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        };
        let model_api_key = std::env::var(key_var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::MissingVar(format!(
                    "{} must be set for '{}' provider",
                    key_var,
                    provider_str.to_lowercase()
                ))
            })?;

        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| provider.default_model().to_string());

        let timeout_str = std::env::var("ORACLE_TIMEOUT_SECS").unwrap_or_else(|_| "30".to_string());
        let oracle_timeout = match timeout_str.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                return Err(ConfigError::InvalidValue(
                    "ORACLE_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a positive number of seconds", timeout_str),
                ));
            }
        };

        let ifttt_webhook_key = std::env::var("IFTTT_WEBHOOK_KEY")
            .ok()
            .filter(|key| !key.is_empty());
        let ifttt_base_url = std::env::var("IFTTT_BASE_URL")
            .ok()
            .filter(|url| !url.is_empty());
        let sos_event_name =
            std::env::var("SOS_EVENT_NAME").unwrap_or_else(|_| "sos_alert".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        Ok(Self {
            bind_address,
            store_backend,
            database_url,
            provider,
            model_api_key,
            chat_model,
            oracle_timeout,
            ifttt_webhook_key,
            ifttt_base_url,
            sos_event_name,
            log_level,
            prompts_path,
        })
    }
}
