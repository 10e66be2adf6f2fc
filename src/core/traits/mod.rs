use std::future::Future;

use async_trait::async_trait;

use crate::core::error::ListenerError;
use crate::core::types::IncomingMessage;

/// Callback invoked for WebSocket messages of the type it was registered under.
///
/// A returned error (or a panic) is logged by the dispatcher and does not stop
/// the remaining listeners or the reader task.
#[async_trait]
pub trait MessageListener: Send + Sync {
    async fn on_message(&self, message: &IncomingMessage) -> Result<(), ListenerError>;
}

/// Adapts an async closure into a [`MessageListener`].
pub struct FnListener<F> {
    handler: F,
}

impl<F> FnListener<F> {
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<F, Fut> MessageListener for FnListener<F>
where
    F: Fn(IncomingMessage) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ListenerError>> + Send,
{
    async fn on_message(&self, message: &IncomingMessage) -> Result<(), ListenerError> {
        (self.handler)(message.clone()).await
    }
}
