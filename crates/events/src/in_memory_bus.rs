//! In-memory event bus for tests/dev.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::bus::{BusConnector, BusError, EventBus, Subscription};

/// A message accepted by the in-memory bus.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub message: JsonValue,
}

/// In-memory pub/sub bus.
///
/// - No IO
/// - Records every accepted message (inspect with `published()`)
/// - Best-effort fan-out to subscribers
/// - Sends can be made to fail to exercise the publisher's error path
#[derive(Debug, Default)]
pub struct InMemoryEventBus {
    published: Mutex<Vec<PublishedMessage>>,
    subscribers: Mutex<Vec<mpsc::Sender<PublishedMessage>>>,
    fail_sends: AtomicBool,
    closed: AtomicBool,
    flushes: AtomicUsize,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription<PublishedMessage> {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned, we still return a subscription;
        // it just won't receive messages.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }

    /// Snapshot of every message accepted so far.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .map(|msgs| msgs.clone())
            .unwrap_or_default()
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    fn reopen(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, topic: &str, message: &JsonValue) -> Result<(), BusError> {
        if self.is_closed() {
            return Err(BusError::Closed);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BusError::Send("simulated send failure".to_string()));
        }

        let entry = PublishedMessage {
            topic: topic.to_string(),
            message: message.clone(),
        };

        self.published
            .lock()
            .map_err(|_| BusError::Send("lock poisoned".to_string()))?
            .push(entry.clone());

        if let Ok(mut subs) = self.subscribers.lock() {
            // Drop any dead subscribers while publishing.
            subs.retain(|tx| tx.send(entry.clone()).is_ok());
        }

        Ok(())
    }

    async fn flush(&self) -> Result<(), BusError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), BusError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector handing out a shared `InMemoryEventBus`.
///
/// Counts connection attempts and can refuse them, which is how tests drive
/// the publisher into its `Disabled` state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnector {
    bus: Arc<InMemoryEventBus>,
    refuse: Arc<AtomicBool>,
    attempts: Arc<AtomicUsize>,
}

impl InMemoryConnector {
    pub fn new(bus: Arc<InMemoryEventBus>) -> Self {
        Self {
            bus,
            ..Self::default()
        }
    }

    /// A connector whose every `connect` fails.
    pub fn refusing() -> Self {
        let connector = Self::default();
        connector.refuse.store(true, Ordering::SeqCst);
        connector
    }

    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        self.bus.clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BusConnector for InMemoryConnector {
    type Bus = Arc<InMemoryEventBus>;

    async fn connect(&self, endpoint: &str) -> Result<Self::Bus, BusError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(BusError::Connection(format!("{endpoint}: connection refused")));
        }
        self.bus.reopen();
        Ok(self.bus.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn publish_records_and_fans_out() {
        let bus = InMemoryEventBus::new();
        let sub = bus.subscribe();

        bus.publish("users", &json!({"event": "UserCreated"})).await.unwrap();

        assert_eq!(bus.published().len(), 1);
        let received = sub.try_recv().unwrap();
        assert_eq!(received.topic, "users");
        assert_eq!(received.message["event"], "UserCreated");
    }

    #[tokio::test]
    async fn closed_bus_rejects_publish() {
        let bus = InMemoryEventBus::new();
        bus.close().await.unwrap();
        let err = bus.publish("users", &json!({})).await.unwrap_err();
        assert_eq!(err, BusError::Closed);
    }

    #[tokio::test]
    async fn refusing_connector_counts_attempts() {
        let connector = InMemoryConnector::refusing();
        assert!(connector.connect("mem://bus").await.is_err());
        assert_eq!(connector.attempts(), 1);
    }
}
