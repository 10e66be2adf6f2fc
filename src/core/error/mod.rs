use thiserror::Error;

/// Error type listener callbacks may return; it is logged and never propagated.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid {field} url: {value}")]
    InvalidUrl { field: String, value: String },
    #[error("invalid timeout: {timeout_ms} ms")]
    InvalidTimeout { timeout_ms: u64 },
    #[error("invalid retry policy: {reason}")]
    InvalidRetryPolicy { reason: String },
    #[error("invalid value for {key}: {reason}")]
    InvalidEnvValue { key: String, reason: String },
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SdkError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("validation error: {message}")]
    Validation { message: String },
    #[error(
        "transport error{context}: {message}",
        context = format_context(Some(.path.as_str()), None, None)
    )]
    Transport { path: String, message: String },
    #[error(
        "status error{context}: {message}",
        context = format_context(Some(.path.as_str()), .request_id.as_deref(), Some(*.status_code))
    )]
    Status {
        path: String,
        status_code: u16,
        request_id: Option<String>,
        message: String,
    },
    #[error(
        "api error{context}: {message}",
        context = format_context(Some(.path.as_str()), .request_id.as_deref(), None)
    )]
    Api {
        path: String,
        request_id: Option<String>,
        message: String,
    },
    #[error(
        "protocol error{context}: {message}",
        context = format_context(.path.as_deref(), .request_id.as_deref(), None)
    )]
    Protocol {
        path: Option<String>,
        request_id: Option<String>,
        message: String,
    },
    #[error(
        "serialization error{context}: {message}",
        context = format_context(.path.as_deref(), .request_id.as_deref(), None)
    )]
    Serialization {
        path: Option<String>,
        request_id: Option<String>,
        message: String,
    },
    #[error("websocket error: {message}")]
    WebSocket { message: String },
    #[error("websocket is not connected")]
    NotConnected,
}

impl SdkError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn websocket(message: impl ToString) -> Self {
        Self::WebSocket {
            message: message.to_string(),
        }
    }

    /// Request id reported by the service, when the failure came from a response.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Status { request_id, .. }
            | Self::Api { request_id, .. }
            | Self::Protocol { request_id, .. }
            | Self::Serialization { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}

fn format_context(path: Option<&str>, request_id: Option<&str>, status_code: Option<u16>) -> String {
    let mut context = Vec::new();

    if let Some(path) = path {
        context.push(format!("path={path}"));
    }
    if let Some(request_id) = request_id {
        context.push(format!("request_id={request_id}"));
    }
    if let Some(status_code) = status_code {
        context.push(format!("status_code={status_code}"));
    }

    if context.is_empty() {
        String::new()
    } else {
        format!(" [{}]", context.join(", "))
    }
}
