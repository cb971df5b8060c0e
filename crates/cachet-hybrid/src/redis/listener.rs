//! Redis pub/sub listener evicting L1 entries changed by other instances.

use super::InvalidationMessage;
use cachet_memory::ExpiringStore;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Cache invalidation listener that subscribes to Redis Pub/Sub.
///
/// ```text
/// Instance 1: set("key1")
///   ↓
/// PUBLISH <channel> {"origin": <instance 1>, "key": "key1"}
///   ↓
/// Instance 2: listener receives "key1" → removes it from L1
/// Instance 1: listener ignores its own message
/// ```
pub struct InvalidationListener {
    redis_url: String,
    channel: String,
    origin: Uuid,
    local: ExpiringStore<Arc<Vec<u8>>>,
}

impl InvalidationListener {
    /// Creates a listener that evicts from `local`.
    #[must_use]
    pub fn new(
        redis_url: impl Into<String>,
        channel: impl Into<String>,
        origin: Uuid,
        local: ExpiringStore<Arc<Vec<u8>>>,
    ) -> Self {
        Self {
            redis_url: redis_url.into(),
            channel: channel.into(),
            origin,
            local,
        }
    }

    /// Start listening for invalidation messages until `cancel` fires.
    ///
    /// Reconnects with exponential backoff if the connection is lost.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut backoff = INITIAL_BACKOFF;

            while !cancel.is_cancelled() {
                match self.run(&cancel).await {
                    Ok(()) => {
                        backoff = INITIAL_BACKOFF;
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            backoff_secs = backoff.as_secs(),
                            "Cache invalidation listener error, reconnecting..."
                        );
                        tokio::select! {
                            () = cancel.cancelled() => break,
                            () = tokio::time::sleep(backoff) => {}
                        }
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                    }
                }
            }

            tracing::info!(channel = %self.channel, "Cache invalidation listener stopped");
        })
    }

    async fn run(&self, cancel: &CancellationToken) -> Result<(), String> {
        let client = redis::Client::open(self.redis_url.as_str())
            .map_err(|e| format!("failed to create Redis client: {e}"))?;

        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| format!("failed to get pub/sub connection: {e}"))?;

        pubsub
            .subscribe(&self.channel)
            .await
            .map_err(|e| format!("failed to subscribe: {e}"))?;

        tracing::info!(channel = %self.channel, "Subscribed to cache invalidation channel");
        self.flush_local();

        let mut stream = pubsub.on_message();
        loop {
            tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                message = stream.next() => match message {
                    Some(msg) => match msg.get_payload::<String>() {
                        Ok(payload) => {
                            self.handle_payload(&payload);
                        }
                        Err(e) => tracing::warn!(error = %e, "failed to read invalidation payload"),
                    },
                    None => return Err("pub/sub connection closed".to_string()),
                },
            }
        }
    }

    /// Drops every L1 entry.
    ///
    /// Runs after each (re)subscription: messages published while the listener
    /// was not subscribed are lost, so no local entry can be trusted.
    pub fn flush_local(&self) {
        self.local.clear();
        tracing::debug!(channel = %self.channel, "local cache tier flushed after subscribe");
    }

    /// Applies one invalidation message, returning the evicted key.
    ///
    /// Messages published by this instance and malformed payloads are ignored.
    pub fn handle_payload(&self, payload: &str) -> Option<String> {
        let message: InvalidationMessage = match serde_json::from_str(payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse invalidation message payload");
                return None;
            }
        };

        if message.origin == self.origin {
            return None;
        }

        tracing::debug!(key = %message.key, "received cache invalidation");
        self.local.remove(&message.key);
        Some(message.key)
    }
}
