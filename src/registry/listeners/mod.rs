use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use futures::FutureExt;
use indexmap::IndexMap;

use crate::core::traits::MessageListener;
use crate::core::types::IncomingMessage;

/// Handle returned on registration; pass it back to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

type ListenerTable = HashMap<String, IndexMap<ListenerId, Arc<dyn MessageListener>>>;

/// Message-type keyed listener table shared between the client and the reader task.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: Arc<RwLock<ListenerTable>>,
    next_id: Arc<AtomicU64>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &self,
        message_type: impl Into<String>,
        listener: Arc<dyn MessageListener>,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.write_listeners()
            .entry(message_type.into())
            .or_default()
            .insert(id, listener);
        id
    }

    /// Returns `false` when nothing was registered under `id` for `message_type`.
    pub fn remove(&self, message_type: &str, id: ListenerId) -> bool {
        let mut listeners = self.write_listeners();
        let Some(entries) = listeners.get_mut(message_type) else {
            return false;
        };

        let removed = entries.shift_remove(&id).is_some();
        if entries.is_empty() {
            listeners.remove(message_type);
        }
        removed
    }

    pub fn clear(&self) {
        self.write_listeners().clear();
    }

    pub fn has_listeners(&self, message_type: &str) -> bool {
        self.read_listeners()
            .get(message_type)
            .is_some_and(|entries| !entries.is_empty())
    }

    pub fn listener_count(&self, message_type: &str) -> usize {
        self.read_listeners()
            .get(message_type)
            .map_or(0, IndexMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.read_listeners().is_empty()
    }

    pub fn message_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.read_listeners().keys().cloned().collect();
        types.sort_unstable();
        types
    }

    /// Invokes every listener for the message's type in registration order and
    /// returns how many ran. Listener failures are logged and skipped.
    pub async fn dispatch(&self, message: &IncomingMessage) -> usize {
        let snapshot: Vec<(ListenerId, Arc<dyn MessageListener>)> = self
            .read_listeners()
            .get(&message.message_type)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(id, listener)| (*id, Arc::clone(listener)))
                    .collect()
            })
            .unwrap_or_default();

        if snapshot.is_empty() {
            tracing::debug!(message_type = %message.message_type, "no listener registered");
            return 0;
        }

        for (id, listener) in &snapshot {
            match AssertUnwindSafe(listener.on_message(message))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(error)) => tracing::error!(
                    message_type = %message.message_type,
                    listener_id = id.as_u64(),
                    error = %error,
                    "websocket listener failed"
                ),
                Err(_) => tracing::error!(
                    message_type = %message.message_type,
                    listener_id = id.as_u64(),
                    "websocket listener panicked"
                ),
            }
        }

        snapshot.len()
    }

    fn read_listeners(&self) -> std::sync::RwLockReadGuard<'_, ListenerTable> {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_listeners(&self) -> std::sync::RwLockWriteGuard<'_, ListenerTable> {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
