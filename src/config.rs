use std::env;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_UPLOAD_MB: u64 = 50;
const DEFAULT_ALLOWED_EXTENSIONS: &str = "pdf,txt,md,docx";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the ragdesk client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the question answering API; endpoint paths are appended to it.
    pub api_url: String,
    /// Delay between two readiness checks of the health poller.
    pub health_interval: Duration,
    /// Timeout applied to non-streaming requests.
    pub request_timeout: Duration,
    /// Client-side upload validation rules.
    pub upload: UploadRules,
    /// Optional path receiving a copy of the log output.
    pub log_file: Option<String>,
}

/// Limits applied to files before they are sent to the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRules {
    /// Largest accepted file, in bytes.
    pub max_bytes: u64,
    /// Lower-case extensions (without the dot) accepted for upload.
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadRules {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            allowed_extensions: parse_extensions(DEFAULT_ALLOWED_EXTENSIONS),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            health_interval: Duration::from_secs(DEFAULT_HEALTH_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            upload: UploadRules::default(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from `lookup`; blank values count as unset.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let parse = |key: &str| -> Result<Option<u64>, ConfigError> {
            get(key)
                .map(|value| {
                    value
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
                })
                .transpose()
        };

        let health_secs =
            parse("RAGDESK_HEALTH_INTERVAL_SECS")?.unwrap_or(DEFAULT_HEALTH_INTERVAL_SECS);
        if health_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "RAGDESK_HEALTH_INTERVAL_SECS".to_string(),
            ));
        }
        let timeout_secs =
            parse("RAGDESK_REQUEST_TIMEOUT_SECS")?.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let max_upload_mb = parse("RAGDESK_MAX_UPLOAD_MB")?.unwrap_or(DEFAULT_MAX_UPLOAD_MB);
        let allowed_extensions = parse_extensions(
            &get("RAGDESK_ALLOWED_EXTENSIONS")
                .unwrap_or_else(|| DEFAULT_ALLOWED_EXTENSIONS.to_string()),
        );
        if allowed_extensions.is_empty() {
            return Err(ConfigError::InvalidValue(
                "RAGDESK_ALLOWED_EXTENSIONS".to_string(),
            ));
        }

        Ok(Self {
            api_url: get("RAGDESK_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            health_interval: Duration::from_secs(health_secs),
            request_timeout: Duration::from_secs(timeout_secs),
            upload: UploadRules {
                max_bytes: max_upload_mb.saturating_mul(1024 * 1024),
                allowed_extensions,
            },
            log_file: get("RAGDESK_LOG_FILE"),
        })
    }
}

fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

/// Load `.env` (when present) and build the configuration from the environment.
pub fn load() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        api_url = %config.api_url,
        health_interval_secs = config.health_interval.as_secs(),
        max_upload_bytes = config.upload.max_bytes,
        extensions = ?config.upload.allowed_extensions,
        "Loaded configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_normalized() {
        assert_eq!(
            parse_extensions(" PDF, .md ,,txt"),
            vec!["pdf".to_string(), "md".to_string(), "txt".to_string()]
        );
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.health_interval, Duration::from_secs(30));
        assert_eq!(config.upload.max_bytes, 50 * 1024 * 1024);
        assert!(config.upload.allowed_extensions.contains(&"pdf".to_string()));
    }

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key: &str| {
            pairs
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn zero_health_interval_is_rejected() {
        let error = Config::from_lookup(lookup(&[("RAGDESK_HEALTH_INTERVAL_SECS", "0")]))
            .expect_err("zero interval");
        let ConfigError::InvalidValue(key) = error;
        assert_eq!(key, "RAGDESK_HEALTH_INTERVAL_SECS");
    }

    #[test]
    fn unparsable_numbers_are_invalid_values() {
        for key in [
            "RAGDESK_HEALTH_INTERVAL_SECS",
            "RAGDESK_REQUEST_TIMEOUT_SECS",
            "RAGDESK_MAX_UPLOAD_MB",
        ] {
            let error =
                Config::from_lookup(lookup(&[(key, "ten")])).expect_err("non-numeric value");
            let ConfigError::InvalidValue(name) = error;
            assert_eq!(name, key);
        }
        assert!(Config::from_lookup(lookup(&[("RAGDESK_MAX_UPLOAD_MB", "-5")])).is_err());
        assert!(Config::from_lookup(lookup(&[("RAGDESK_ALLOWED_EXTENSIONS", " , ")])).is_err());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = Config::from_lookup(lookup(&[
            ("RAGDESK_API_URL", "  "),
            ("RAGDESK_HEALTH_INTERVAL_SECS", ""),
            ("RAGDESK_LOG_FILE", " "),
        ]))
        .expect("config");
        assert_eq!(config.api_url, "http://127.0.0.1:8000");
        assert_eq!(config.health_interval, Duration::from_secs(30));
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn values_are_trimmed_and_applied() {
        let config = Config::from_lookup(lookup(&[
            ("RAGDESK_API_URL", "http://rag.local:9000/"),
            ("RAGDESK_HEALTH_INTERVAL_SECS", " 5 "),
            ("RAGDESK_MAX_UPLOAD_MB", "2"),
            ("RAGDESK_ALLOWED_EXTENSIONS", "TXT"),
        ]))
        .expect("config");
        assert_eq!(config.api_url, "http://rag.local:9000/");
        assert_eq!(config.health_interval, Duration::from_secs(5));
        assert_eq!(config.upload.max_bytes, 2 * 1024 * 1024);
        assert_eq!(config.upload.allowed_extensions, vec!["txt".to_string()]);
    }
}
