use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::config::SdkConfig;
use crate::core::error::{ConfigError, SdkError};
use crate::core::types::ApiEnvelope;

const DEFAULT_FAILURE_MESSAGE: &str = "request failed";

/// Exponential backoff between attempts: `initial * 2^retry`, capped at `max_backoff_ms`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidRetryPolicy {
                reason: "max_attempts must be >= 1".to_string(),
            });
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(ConfigError::InvalidRetryPolicy {
                reason: "max_backoff_ms must be >= initial_backoff_ms".to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn backoff_duration_for_retry(&self, retry_index: u32) -> Duration {
        let shift = retry_index.min(63);
        let multiplier = 1_u64.checked_shl(shift).unwrap_or(u64::MAX);
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(multiplier)
            .min(self.max_backoff_ms);
        Duration::from_millis(backoff_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 2_000,
            max_backoff_ms: 30_000,
        }
    }
}

/// JSON-over-HTTP client for the service's `{success, data, message}` endpoints.
///
/// Every failure inside an attempt is retried: connection and timeout errors,
/// non-2xx statuses, undecodable envelopes and `success: false` replies. Once
/// the policy is exhausted the error from the final attempt is returned.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
    retry_policy: RetryPolicy,
    timeout_ms: u64,
    request_id_header: HeaderName,
}

impl HttpTransport {
    pub fn new(config: &SdkConfig) -> Result<Self, ConfigError> {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &SdkConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let headers = build_default_headers(config)?;
        let request_id_header = HeaderName::from_bytes(config.request_id_header.as_bytes())
            .map_err(|error| ConfigError::InvalidHeader {
                name: config.request_id_header.clone(),
                reason: error.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            headers,
            retry_policy: config.retry_policy.clone(),
            timeout_ms: config.timeout_ms,
            request_id_header,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub async fn get_json<TResp>(&self, path: &str) -> Result<TResp, SdkError>
    where
        TResp: DeserializeOwned,
    {
        let (data, request_id) = self.execute_envelope_request(Method::GET, path, None).await?;
        decode_data(path, request_id, data)
    }

    pub async fn post_json<TReq, TResp>(&self, path: &str, body: &TReq) -> Result<TResp, SdkError>
    where
        TReq: Serialize + ?Sized,
        TResp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(|error| SdkError::Serialization {
            path: Some(path.to_string()),
            request_id: None,
            message: error.to_string(),
        })?;

        let (data, request_id) = self
            .execute_envelope_request(Method::POST, path, Some(payload))
            .await?;
        decode_data(path, request_id, data)
    }

    async fn execute_envelope_request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(Value, Option<String>), SdkError> {
        let url = format!("{}{}", self.base_url, path);

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            tracing::debug!(%method, %url, attempt, "sending request");

            let error = match self.send_once(method.clone(), path, &url, body.as_ref()).await {
                Ok((envelope, request_id)) if envelope.success => {
                    return match envelope.data {
                        Some(data) => Ok((data, request_id)),
                        None => Err(SdkError::Protocol {
                            path: Some(path.to_string()),
                            request_id,
                            message: "successful response carried no data".to_string(),
                        }),
                    };
                }
                Ok((envelope, request_id)) => SdkError::Api {
                    path: path.to_string(),
                    request_id,
                    message: envelope
                        .message
                        .filter(|message| !message.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
                },
                Err(error) => error,
            };

            if attempt >= self.retry_policy.max_attempts {
                return Err(error);
            }

            tracing::warn!(
                path,
                attempt,
                max_attempts = self.retry_policy.max_attempts,
                error = %error,
                "request failed, retrying"
            );
            self.sleep_before_retry(attempt).await;
        }
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        url: &str,
        body: Option<&Vec<u8>>,
    ) -> Result<(ApiEnvelope<Value>, Option<String>), SdkError> {
        let mut request_builder = self
            .client
            .request(method, url)
            .timeout(Duration::from_millis(self.timeout_ms))
            .headers(self.headers.clone());

        if let Some(payload) = body {
            request_builder = request_builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(payload.clone());
        }

        let response = request_builder
            .send()
            .await
            .map_err(|error| SdkError::Transport {
                path: path.to_string(),
                message: error.to_string(),
            })?;

        let request_id = extract_request_id(response.headers(), &self.request_id_header);
        if !response.status().is_success() {
            return Err(build_status_error(path, request_id, response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|error| SdkError::Transport {
                path: path.to_string(),
                message: format!("failed to read response body: {error}"),
            })?;

        let envelope = serde_json::from_slice::<ApiEnvelope<Value>>(&bytes).map_err(|error| {
            SdkError::Serialization {
                path: Some(path.to_string()),
                request_id: request_id.clone(),
                message: error.to_string(),
            }
        })?;

        Ok((envelope, request_id))
    }

    async fn sleep_before_retry(&self, attempt: u32) {
        let retry_index = attempt.saturating_sub(1);
        let backoff = self.retry_policy.backoff_duration_for_retry(retry_index);
        tokio::time::sleep(backoff).await;
    }
}

async fn build_status_error(path: &str, request_id: Option<String>, response: Response) -> SdkError {
    let status_code = response.status().as_u16();
    let message = match response.text().await {
        Ok(body) if !body.trim().is_empty() => body,
        Ok(_) => format!("http status {status_code}"),
        Err(error) => {
            format!("http status {status_code}; failed to read response body: {error}")
        }
    };

    SdkError::Status {
        path: path.to_string(),
        status_code,
        request_id,
        message,
    }
}

fn decode_data<TResp>(path: &str, request_id: Option<String>, data: Value) -> Result<TResp, SdkError>
where
    TResp: DeserializeOwned,
{
    serde_json::from_value(data).map_err(|error| SdkError::Serialization {
        path: Some(path.to_string()),
        request_id,
        message: error.to_string(),
    })
}

fn build_default_headers(config: &SdkConfig) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();

    if let Some(api_key) = &config.api_key {
        let auth_value = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|error| {
            ConfigError::InvalidHeader {
                name: AUTHORIZATION.to_string(),
                reason: error.to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, auth_value);
    }

    for (name, value) in &config.headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|error| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: error.to_string(),
            })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|error| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: error.to_string(),
            })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

fn extract_request_id(headers: &HeaderMap, header_name: &HeaderName) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
