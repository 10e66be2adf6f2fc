use std::collections::BTreeMap;

use crate::core::error::ConfigError;
use crate::transport::http::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_WEBSOCKET_URL: &str = "ws://localhost:8081";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";

pub const BASE_URL_ENV: &str = "VR_TRANSLATE_BASE_URL";
pub const WEBSOCKET_URL_ENV: &str = "VR_TRANSLATE_WS_URL";
pub const TIMEOUT_MS_ENV: &str = "VR_TRANSLATE_TIMEOUT_MS";
pub const RETRIES_ENV: &str = "VR_TRANSLATE_RETRIES";
pub const API_KEY_ENV: &str = "VR_TRANSLATE_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkConfig {
    pub base_url: String,
    pub websocket_url: String,
    pub timeout_ms: u64,
    pub retry_policy: RetryPolicy,
    pub api_key: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// Response header whose value is attached to errors as `request_id`.
    pub request_id_header: String,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            websocket_url: DEFAULT_WEBSOCKET_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry_policy: RetryPolicy::default(),
            api_key: None,
            headers: BTreeMap::new(),
            request_id_header: DEFAULT_REQUEST_ID_HEADER.to_string(),
        }
    }
}

impl SdkConfig {
    /// Defaults overridden by the `VR_TRANSLATE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();

        if let Some(base_url) = read(BASE_URL_ENV) {
            config = config.with_base_url(base_url);
        }
        if let Some(websocket_url) = read(WEBSOCKET_URL_ENV) {
            config.websocket_url = websocket_url;
        }
        if let Some(raw) = read(TIMEOUT_MS_ENV) {
            config.timeout_ms = parse_env_number(TIMEOUT_MS_ENV, &raw)?;
        }
        if let Some(raw) = read(RETRIES_ENV) {
            config.retry_policy.max_attempts = parse_env_number(RETRIES_ENV, &raw)?;
        }
        config.api_key = read(API_KEY_ENV);

        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    pub fn with_websocket_url(mut self, websocket_url: impl Into<String>) -> Self {
        self.websocket_url = websocket_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Total attempts per request, counting the first one.
    pub fn with_retries(mut self, max_attempts: u32) -> Self {
        self.retry_policy.max_attempts = max_attempts;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = if api_key.trim().is_empty() {
            None
        } else {
            Some(api_key)
        };
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_request_id_header(mut self, name: impl Into<String>) -> Self {
        self.request_id_header = name.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl {
                field: "base".to_string(),
                value: self.base_url.clone(),
            });
        }
        if !(self.websocket_url.starts_with("ws://") || self.websocket_url.starts_with("wss://")) {
            return Err(ConfigError::InvalidUrl {
                field: "websocket".to_string(),
                value: self.websocket_url.clone(),
            });
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout {
                timeout_ms: self.timeout_ms,
            });
        }
        self.retry_policy.validate()
    }
}

fn normalize_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim().trim_end_matches('/').to_string()
}

fn parse_env_number<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|error| ConfigError::InvalidEnvValue {
            key: key.to_string(),
            reason: format!("{raw:?}: {error}"),
        })
}
