//! Redis pub/sub-backed event bus.
//!
//! Redis pub/sub is not durable: messages published while no subscriber is
//! listening are dropped. That matches the fire-and-forget contract of
//! `EventPublisher`; nothing here retries or buffers.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use userhub_events::{BusConnector, BusError, EventBus};

/// Opens a multiplexed Redis connection for an endpoint URL
/// (e.g. `redis://localhost:6379`).
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnector;

#[async_trait]
impl BusConnector for RedisConnector {
    type Bus = RedisPubSubBus;

    async fn connect(&self, endpoint: &str) -> Result<Self::Bus, BusError> {
        let client =
            redis::Client::open(endpoint).map_err(|e| BusError::Connection(e.to_string()))?;

        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| BusError::Connection(e.to_string()))?;

        Ok(RedisPubSubBus {
            conn: RwLock::new(Some(conn)),
        })
    }
}

/// Redis pub/sub bus for JSON event payloads (`PUBLISH <topic> <json>`).
pub struct RedisPubSubBus {
    conn: RwLock<Option<MultiplexedConnection>>,
}

#[async_trait]
impl EventBus for RedisPubSubBus {
    async fn publish(&self, topic: &str, message: &JsonValue) -> Result<(), BusError> {
        let payload =
            serde_json::to_string(message).map_err(|e| BusError::Serialize(e.to_string()))?;

        // Multiplexed connections are cheap to clone and share one socket.
        let mut conn = self.conn.read().await.clone().ok_or(BusError::Closed)?;

        let _receivers: i64 = conn
            .publish(topic, payload)
            .await
            .map_err(|e| BusError::Send(e.to_string()))?;

        Ok(())
    }

    async fn flush(&self) -> Result<(), BusError> {
        // PUBLISH is written immediately; the client keeps no outbound buffer.
        Ok(())
    }

    async fn close(&self) -> Result<(), BusError> {
        self.conn.write().await.take();
        Ok(())
    }
}
