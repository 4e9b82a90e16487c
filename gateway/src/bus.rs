//! # bus
//!
//! Topic-addressed publish/subscribe behind the [`MessageBus`] trait.
//!
//! The bus is the only coordination fabric between the gateway processes:
//! topic routing is the sole synchronization primitive. Production wiring
//! uses Redis pub/sub ([`RedisBus`]); tests and single-process setups use
//! [`MemoryBus`].
//!
//! Subscriptions are delivered through a plain `mpsc` receiver so every
//! consumer drains its messages on one task: engine state never needs a lock.
//! A closed receiver means the bus connection died; that is fatal for the
//! process, the supervisor restarts it.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus I/O: {0}")]
    Io(#[from] redis::RedisError),
}

/// One delivered publication.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

#[async_trait]
pub trait MessageBus: Send + Sync + 'static {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), BusError>;

    /// Subscribe to a set of topics. A pattern ending in `*` matches any
    /// topic with that prefix; anything else matches exactly.
    async fn subscribe(&self, patterns: &[String]) -> Result<mpsc::Receiver<BusMessage>, BusError>;
}

/// Trailing-`*` glob match, shared by [`MemoryBus`] and consumers that route
/// on delivered topics.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => topic.starts_with(prefix),
        None => pattern == topic,
    }
}

// ── Redis pub/sub ─────────────────────────────────────────────────────────────

pub struct RedisBus {
    client: redis::Client,
    conn: redis::aio::MultiplexedConnection,
}

impl RedisBus {
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { client, conn })
    }
}

#[async_trait]
impl MessageBus for RedisBus {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        let _: () = redis::AsyncCommands::publish(&mut conn, topic, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, patterns: &[String]) -> Result<mpsc::Receiver<BusMessage>, BusError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        for pattern in patterns {
            if pattern.contains('*') {
                pubsub.psubscribe(pattern).await?;
            } else {
                pubsub.subscribe(pattern).await?;
            }
        }

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let topic = msg.get_channel_name().to_string();
                let payload: Vec<u8> = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("bus: undecodable payload on {topic}: {e}");
                        continue;
                    }
                };
                if tx.send(BusMessage { topic, payload }).await.is_err() {
                    break;
                }
            }
            // Stream end = connection lost. Dropping the sender closes the
            // consumer's queue, which consumers treat as fatal.
        });
        Ok(rx)
    }
}

// ── In-memory bus (tests, single-process wiring) ─────────────────────────────

#[derive(Default)]
pub struct MemoryBus {
    subscribers: Mutex<Vec<(Vec<String>, mpsc::Sender<BusMessage>)>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), BusError> {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|(patterns, tx)| {
            if patterns.iter().any(|p| topic_matches(p, topic)) {
                let msg = BusMessage { topic: topic.to_string(), payload: payload.to_vec() };
                // A full or closed queue drops the subscriber, mirroring a
                // dead bus connection.
                return tx.try_send(msg).is_ok();
            }
            !tx.is_closed()
        });
        Ok(())
    }

    async fn subscribe(&self, patterns: &[String]) -> Result<mpsc::Receiver<BusMessage>, BusError> {
        let (tx, rx) = mpsc::channel(256);
        self.subscribers.lock().unwrap().push((patterns.to_vec(), tx));
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_matching() {
        assert!(topic_matches("global/*", "global/movement"));
        assert!(topic_matches("receive/16", "receive/16"));
        assert!(!topic_matches("receive/16", "receive/161"));
        assert!(!topic_matches("global/*", "helo/request"));
    }

    #[tokio::test]
    async fn memory_bus_routes_by_pattern() {
        let bus = MemoryBus::new();
        let mut global = bus.subscribe(&["global/*".into()]).await.unwrap();
        let mut exact = bus.subscribe(&["receive/16".into()]).await.unwrap();

        bus.publish("global/movement", b"m").await.unwrap();
        bus.publish("receive/16", b"p").await.unwrap();
        bus.publish("receive/17", b"q").await.unwrap();

        assert_eq!(global.try_recv().unwrap().topic, "global/movement");
        assert_eq!(exact.try_recv().unwrap().payload, b"p");
        assert!(exact.try_recv().is_err());
    }
}
