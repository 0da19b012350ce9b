//! Runtime configuration loaded from the environment.
//!
//! Values may come from a `.env` file (loaded by `dotenvy` in `run`).

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    pub google: Option<GoogleConfig>,
    pub calendar_timezone: String,
    pub frontend_url: Option<String>,
}

/// S3/R2 bucket used for photo blobs.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    /// Base URL objects are publicly served from, e.g. a CDN or R2 public bucket.
    pub public_url: Option<String>,
    pub timeout: Duration,
}

/// OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

/// Google OAuth client credentials.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

const DEFAULT_LLM_BASE_URL: &str = "https://api.dedaluslabs.ai/v1";
const DEFAULT_LLM_MODEL: &str = "anthropic/claude-sonnet-4-5-20250929";

impl Config {
    /// Read configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage = StorageConfig {
            bucket: required("S3_BUCKET")?,
            region: optional("S3_REGION").unwrap_or_else(|| "auto".to_string()),
            endpoint: optional("S3_ENDPOINT"),
            access_key: required("S3_ACCESS_KEY")?,
            secret_key: required("S3_SECRET_KEY")?,
            public_url: optional("S3_PUBLIC_URL"),
            timeout: Duration::from_secs(parsed("S3_TIMEOUT_SECS", 30)?),
        };

        let llm = LlmConfig {
            base_url: optional("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            api_key: optional("LLM_API_KEY"),
            model: optional("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            timeout: Duration::from_secs(parsed("LLM_TIMEOUT_SECS", 60)?),
        };

        let google = match (
            optional("GOOGLE_CLIENT_ID"),
            optional("GOOGLE_CLIENT_SECRET"),
            optional("GOOGLE_REDIRECT_URI"),
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_uri)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_uri,
            }),
            _ => None,
        };

        Ok(Self {
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed("PORT", 8001)?,
            database_url: required("DATABASE_URL")?,
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS", 10)?,
            storage,
            llm,
            google,
            calendar_timezone: optional("CALENDAR_TIMEZONE").unwrap_or_else(|| "UTC".to_string()),
            frontend_url: optional("FRONTEND_URL"),
        })
    }

    /// Socket address string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parsed<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_error_message() {
        let err = ConfigError::Missing("DATABASE_URL");
        assert_eq!(err.to_string(), "DATABASE_URL must be set");
    }

    #[test]
    fn test_parsed_default_and_invalid() {
        assert_eq!(parsed::<u16>("DAYFLOW_TEST_UNSET_PORT", 8001).unwrap(), 8001);

        std::env::set_var("DAYFLOW_TEST_BAD_PORT", "eighty");
        let err = parsed::<u16>("DAYFLOW_TEST_BAD_PORT", 8001).unwrap_err();
        assert!(err.to_string().starts_with("DAYFLOW_TEST_BAD_PORT is invalid"));
    }
}
