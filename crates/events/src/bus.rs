//! Publish-only event bus abstraction (mechanics only).
//!
//! The bus is the **transport** for user lifecycle events after the owning
//! database transaction has committed:
//!
//! ```text
//! UserWriter → UserStore (commit) → EventPublisher → EventBus (publish) → broker
//! ```
//!
//! ## Delivery Guarantees
//!
//! None. Publishing is fire-and-forget: no retry, no buffering, no ordering
//! across calls and no confirmation returned to the writer. A crash between
//! commit and publish drops the event.
//!
//! ## Connecting
//!
//! Buses are not constructed eagerly. A `BusConnector` knows how to open a
//! bus for an endpoint, and `EventPublisher` calls it on first use.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Transport error raised by a bus or connector.
///
/// These never reach the callers of `UserWriter`; `EventPublisher` logs and
/// absorbs them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("send error: {0}")]
    Send(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("bus closed")]
    Closed,
}

/// A subscription to messages observed by an in-process bus.
///
/// Only in-process buses offer subscriptions (the production bus is
/// publish-only). Each subscription receives a copy of every message
/// published after it was created.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Publish-only message bus client.
///
/// The trait requires `Send + Sync`; a connected bus is shared by every
/// writer in the process.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Hand a JSON message to the bus on `topic`. Returns once the client
    /// accepted it, not once any consumer received it.
    async fn publish(&self, topic: &str, message: &JsonValue) -> Result<(), BusError>;

    /// Push out anything the client buffered.
    async fn flush(&self) -> Result<(), BusError>;

    /// Release the connection. Publishing afterwards fails with `BusError::Closed`.
    async fn close(&self) -> Result<(), BusError>;
}

#[async_trait]
impl<B> EventBus for Arc<B>
where
    B: EventBus + ?Sized,
{
    async fn publish(&self, topic: &str, message: &JsonValue) -> Result<(), BusError> {
        (**self).publish(topic, message).await
    }

    async fn flush(&self) -> Result<(), BusError> {
        (**self).flush().await
    }

    async fn close(&self) -> Result<(), BusError> {
        (**self).close().await
    }
}

/// Opens a bus for an endpoint address.
#[async_trait]
pub trait BusConnector: Send + Sync {
    type Bus: EventBus + 'static;

    async fn connect(&self, endpoint: &str) -> Result<Self::Bus, BusError>;
}
