use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::core::config::SdkConfig;
use crate::core::error::{ConfigError, ListenerError, SdkError};
use crate::core::traits::{FnListener, MessageListener};
use crate::core::types::{
    BatchTranslateRequest, BatchTranslationResult, ImageInput, IncomingMessage, LanguageList,
    MAX_BATCH_SIZE, OcrRequest, OcrResult, OcrTranslateRequest, OcrTranslationResult,
    OutgoingKind, OutgoingMessage, ServiceStats, TranslateRequest, TranslationResult, unix_millis,
};
use crate::registry::listeners::{ListenerId, ListenerRegistry};
use crate::transport::http::{HttpTransport, RetryPolicy};
use crate::transport::ws::WsConnection;

const TRANSLATE_PATH: &str = "/api/translate";
const BATCH_TRANSLATE_PATH: &str = "/api/translate/batch";
const OCR_PATH: &str = "/api/ocr";
const OCR_TRANSLATE_PATH: &str = "/api/ocr-translate";
const LANGUAGES_PATH: &str = "/api/languages";
const STATS_PATH: &str = "/api/stats";

/// Client for the translation service's REST API and WebSocket channel.
///
/// Clones share the HTTP client, the listener table and the WebSocket session.
#[derive(Clone)]
pub struct VrTranslateClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: SdkConfig,
    transport: HttpTransport,
    listeners: ListenerRegistry,
    connection: Mutex<Option<WsConnection>>,
    next_message_id: AtomicU64,
}

pub struct VrTranslateClientBuilder {
    config: SdkConfig,
    http_client: Option<reqwest::Client>,
}

impl VrTranslateClient {
    pub fn builder() -> VrTranslateClientBuilder {
        VrTranslateClientBuilder {
            config: SdkConfig::default(),
            http_client: None,
        }
    }

    pub fn new(config: SdkConfig) -> Result<Self, ConfigError> {
        Self::builder().with_config(config).build()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(SdkConfig::from_env()?)
    }

    pub fn config(&self) -> &SdkConfig {
        &self.inner.config
    }

    pub async fn translate(
        &self,
        text: impl Into<String>,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<TranslationResult, SdkError> {
        let request = TranslateRequest {
            text: text.into(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        };

        let result: TranslationResult = self
            .inner
            .transport
            .post_json(TRANSLATE_PATH, &request)
            .await?;
        tracing::debug!(?result, "translation completed");
        Ok(result)
    }

    /// Rejects an empty list or more than 100 texts before touching the network.
    pub async fn batch_translate<S>(
        &self,
        texts: &[S],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<BatchTranslationResult, SdkError>
    where
        S: AsRef<str>,
    {
        if texts.is_empty() {
            return Err(SdkError::validation("texts must be a non-empty list"));
        }
        if texts.len() > MAX_BATCH_SIZE {
            return Err(SdkError::validation(format!(
                "maximum {MAX_BATCH_SIZE} texts allowed for batch translation, got {}",
                texts.len()
            )));
        }

        let request = BatchTranslateRequest {
            texts: texts.iter().map(|text| text.as_ref().to_string()).collect(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        };

        let result: BatchTranslationResult = self
            .inner
            .transport
            .post_json(BATCH_TRANSLATE_PATH, &request)
            .await?;
        tracing::debug!(
            total = result.total,
            successful = result.successful,
            failed = result.failed,
            "batch translation completed"
        );
        Ok(result)
    }

    pub async fn ocr(
        &self,
        image: impl Into<ImageInput>,
        lang: &str,
    ) -> Result<OcrResult, SdkError> {
        let request = OcrRequest {
            image: image.into().into_wire(),
            lang: lang.to_string(),
        };

        let result: OcrResult = self.inner.transport.post_json(OCR_PATH, &request).await?;
        tracing::debug!(?result, "ocr completed");
        Ok(result)
    }

    pub async fn ocr_translate(
        &self,
        image: impl Into<ImageInput>,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<OcrTranslationResult, SdkError> {
        let request = OcrTranslateRequest {
            image: image.into().into_wire(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        };

        let result: OcrTranslationResult = self
            .inner
            .transport
            .post_json(OCR_TRANSLATE_PATH, &request)
            .await?;
        tracing::debug!(?result, "ocr translation completed");
        Ok(result)
    }

    pub async fn get_languages(&self) -> Result<LanguageList, SdkError> {
        let languages: LanguageList = self.inner.transport.get_json(LANGUAGES_PATH).await?;
        tracing::debug!(common = languages.common.len(), "languages fetched");
        Ok(languages)
    }

    pub async fn get_stats(&self) -> Result<ServiceStats, SdkError> {
        let stats: ServiceStats = self.inner.transport.get_json(STATS_PATH).await?;
        tracing::debug!(?stats, "stats fetched");
        Ok(stats)
    }

    /// Opens the WebSocket session. An existing session is closed once the new
    /// one is up; a failed connect leaves it in place.
    pub async fn connect_websocket(&self) -> Result<(), SdkError> {
        let connection = WsConnection::connect(
            &self.inner.config.websocket_url,
            self.inner.listeners.clone(),
            Duration::from_millis(self.inner.config.timeout_ms),
        )
        .await?;

        let previous = self.inner.connection.lock().await.replace(connection);
        if let Some(previous) = previous {
            previous.close().await;
        }
        Ok(())
    }

    /// Closes the session and drops every registered listener. No-op when not connected.
    pub async fn disconnect_websocket(&self) {
        let previous = self.inner.connection.lock().await.take();
        if let Some(connection) = previous {
            connection.close().await;
            self.inner.listeners.clear();
        }
    }

    pub async fn is_websocket_connected(&self) -> bool {
        self.inner
            .connection
            .lock()
            .await
            .as_ref()
            .is_some_and(WsConnection::is_open)
    }

    pub async fn send_gaze_data<P>(&self, gaze_data: &P) -> Result<(), SdkError>
    where
        P: Serialize + ?Sized,
    {
        self.send_websocket_message(OutgoingKind::Gaze, gaze_data)
            .await
    }

    pub async fn send_screenshot<P>(&self, screenshot: &P) -> Result<(), SdkError>
    where
        P: Serialize + ?Sized,
    {
        self.send_websocket_message(OutgoingKind::Screenshot, screenshot)
            .await
    }

    pub async fn send_config<P>(&self, config: &P) -> Result<(), SdkError>
    where
        P: Serialize + ?Sized,
    {
        self.send_websocket_message(OutgoingKind::Config, config)
            .await
    }

    pub fn on_message(
        &self,
        message_type: impl Into<String>,
        listener: Arc<dyn MessageListener>,
    ) -> ListenerId {
        self.inner.listeners.add(message_type, listener)
    }

    /// Registers an async closure as a listener.
    pub fn on_message_fn<F, Fut>(&self, message_type: impl Into<String>, handler: F) -> ListenerId
    where
        F: Fn(IncomingMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
    {
        self.on_message(message_type, Arc::new(FnListener::new(handler)))
    }

    pub fn off_message(&self, message_type: &str, id: ListenerId) -> bool {
        self.inner.listeners.remove(message_type, id)
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.inner.listeners
    }

    /// Releases the WebSocket session; HTTP calls remain usable afterwards.
    pub async fn close(&self) {
        self.disconnect_websocket().await;
    }

    async fn send_websocket_message<P>(&self, kind: OutgoingKind, payload: &P) -> Result<(), SdkError>
    where
        P: Serialize + ?Sized,
    {
        let slot = self.inner.connection.lock().await;
        let connection = match slot.as_ref() {
            Some(connection) if connection.is_open() => connection,
            _ => return Err(SdkError::NotConnected),
        };

        let payload = serde_json::to_value(payload).map_err(|error| SdkError::Serialization {
            path: None,
            request_id: None,
            message: error.to_string(),
        })?;

        let message = OutgoingMessage {
            kind,
            payload,
            id: self.inner.next_message_id.fetch_add(1, Ordering::SeqCst) + 1,
            timestamp: unix_millis(),
        };
        connection.send_message(&message).await
    }
}

impl VrTranslateClientBuilder {
    pub fn with_config(mut self, config: SdkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config = self.config.with_base_url(base_url);
        self
    }

    pub fn with_websocket_url(mut self, websocket_url: impl Into<String>) -> Self {
        self.config = self.config.with_websocket_url(websocket_url);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config = self.config.with_timeout_ms(timeout_ms);
        self
    }

    pub fn with_retries(mut self, max_attempts: u32) -> Self {
        self.config = self.config.with_retries(max_attempts);
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.config = self.config.with_retry_policy(retry_policy);
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config = self.config.with_api_key(api_key);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config = self.config.with_header(name, value);
        self
    }

    pub fn with_request_id_header(mut self, name: impl Into<String>) -> Self {
        self.config = self.config.with_request_id_header(name);
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn build(self) -> Result<VrTranslateClient, ConfigError> {
        let transport = match self.http_client {
            Some(client) => HttpTransport::with_client(client, &self.config)?,
            None => HttpTransport::new(&self.config)?,
        };

        Ok(VrTranslateClient {
            inner: Arc::new(ClientInner {
                config: self.config,
                transport,
                listeners: ListenerRegistry::new(),
                connection: Mutex::new(None),
                next_message_id: AtomicU64::new(0),
            }),
        })
    }
}
