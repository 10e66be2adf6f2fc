use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::core::error::SdkError;
use crate::core::types::{IncomingMessage, OutgoingMessage};
use crate::registry::listeners::ListenerRegistry;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// One live WebSocket session: a locked write half plus the background reader
/// task that feeds incoming messages to the listener registry.
pub struct WsConnection {
    url: String,
    sender: Arc<Mutex<WsSink>>,
    open: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl WsConnection {
    /// Opens the socket, giving up once the handshake exceeds `open_timeout`.
    #[tracing::instrument(skip(registry))]
    pub async fn connect(
        url: &str,
        registry: ListenerRegistry,
        open_timeout: Duration,
    ) -> Result<Self, SdkError> {
        let (ws_stream, _) = match tokio::time::timeout(open_timeout, connect_async(url)).await {
            Ok(Ok(connected)) => connected,
            Ok(Err(error)) => {
                tracing::error!(error = %error, "websocket connect failed");
                return Err(SdkError::websocket(error));
            }
            Err(_) => {
                tracing::error!(timeout = ?open_timeout, "websocket handshake timed out");
                return Err(SdkError::websocket(format!(
                    "handshake timed out after {open_timeout:?}"
                )));
            }
        };

        let (sender, receiver) = ws_stream.split();
        let open = Arc::new(AtomicBool::new(true));
        let reader = tokio::spawn(receive_loop(receiver, registry, Arc::clone(&open)));

        tracing::debug!("websocket connected");
        Ok(Self {
            url: url.to_string(),
            sender: Arc::new(Mutex::new(sender)),
            open,
            reader,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// False once the peer closed the socket, the read side failed, or `close` ran.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.reader.is_finished()
    }

    pub async fn send_message(&self, message: &OutgoingMessage) -> Result<(), SdkError> {
        let text = serde_json::to_string(message).map_err(|error| SdkError::Serialization {
            path: None,
            request_id: None,
            message: error.to_string(),
        })?;
        self.send_text(text).await?;
        tracing::debug!(kind = message.kind.as_str(), id = message.id, "websocket message sent");
        Ok(())
    }

    pub async fn send_text(&self, text: String) -> Result<(), SdkError> {
        if !self.is_open() {
            return Err(SdkError::NotConnected);
        }

        self.sender
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .map_err(SdkError::websocket)
    }

    pub async fn close(self) {
        self.open.store(false, Ordering::SeqCst);

        {
            let mut sender = self.sender.lock().await;
            if let Err(error) = sender.send(Message::Close(None)).await {
                tracing::debug!(error = %error, "close frame not delivered");
            }
            if let Err(error) = sender.close().await {
                tracing::debug!(error = %error, "websocket sink close failed");
            }
        }

        self.reader.abort();
        tracing::debug!("websocket closed");
    }
}

async fn receive_loop(
    mut receiver: SplitStream<WsStream>,
    registry: ListenerRegistry,
    open: Arc<AtomicBool>,
) {
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_text(&text, &registry).await,
            Ok(Message::Close(_)) => {
                tracing::debug!("websocket closed by server");
                break;
            }
            Ok(_) => {}
            Err(error) => {
                tracing::error!(error = %error, "websocket read failed");
                break;
            }
        }
    }

    open.store(false, Ordering::SeqCst);
}

async fn handle_text(text: &str, registry: &ListenerRegistry) {
    let message = match serde_json::from_str::<IncomingMessage>(text) {
        Ok(message) => message,
        Err(error) => {
            tracing::error!(error = %error, "failed to parse websocket message");
            return;
        }
    };

    tracing::debug!(
        message_type = %message.message_type,
        "websocket message received"
    );
    registry.dispatch(&message).await;
}
