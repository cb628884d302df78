//! Fire-and-forget publisher for user lifecycle events.
//!
//! `EventPublisher` wraps a `BusConnector` and owns the process-wide bus
//! connection. It is constructed once at startup, shared by writers, and
//! closed at shutdown by whoever constructed it.
//!
//! ## States
//!
//! ```text
//!              publish: connect ok
//!   Idle ─────────────────────────▶ Connected
//!    │  ▲                              │
//!    │  └────────── close() ───────────┘
//!    │ publish: connect failed
//!    ▼
//! Disabled (terminal)        Unconfigured (terminal, chosen at construction)
//! ```
//!
//! `publish` never returns an error. This is the one place in the workspace
//! where failures are logged and dropped instead of propagated.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::bus::{BusConnector, EventBus};
use crate::payload::EventPayload;

/// Message-bus settings consumed by the publisher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PublisherConfig {
    pub endpoint: Option<String>,
    pub topic: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl PublisherConfig {
    pub fn new(endpoint: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            topic: Some(topic.into()),
            enabled: true,
        }
    }

    /// A config that always yields an unconfigured publisher.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Both endpoint and topic are present and non-blank.
    pub fn is_complete(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.endpoint) && present(&self.topic)
    }
}

/// Observable publisher state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PublisherStatus {
    Unconfigured,
    Idle,
    Connected,
    Disabled,
}

/// What happened to a single `publish` call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The bus client accepted the message.
    Sent,
    /// The publisher is unconfigured or disabled; nothing was attempted.
    Skipped,
    /// Serialization or send failed; the failure was logged.
    Failed,
}

#[derive(Debug, Clone)]
struct Target {
    endpoint: String,
    topic: String,
}

enum State<B> {
    Unconfigured,
    Idle,
    Connected(Arc<B>),
    Disabled,
}

impl<B> State<B> {
    fn status(&self) -> PublisherStatus {
        match self {
            State::Unconfigured => PublisherStatus::Unconfigured,
            State::Idle => PublisherStatus::Idle,
            State::Connected(_) => PublisherStatus::Connected,
            State::Disabled => PublisherStatus::Disabled,
        }
    }
}

/// Lazily connecting, self-disabling event publisher.
pub struct EventPublisher<C: BusConnector> {
    connector: C,
    target: Option<Target>,
    state: Mutex<State<C::Bus>>,
}

impl<C: BusConnector> core::fmt::Debug for EventPublisher<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventPublisher")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl<C: BusConnector> EventPublisher<C> {
    pub fn new(config: PublisherConfig, connector: C) -> Self {
        let target = match (config.enabled, config.endpoint, config.topic) {
            (true, Some(endpoint), Some(topic))
                if !endpoint.trim().is_empty() && !topic.trim().is_empty() =>
            {
                Some(Target { endpoint, topic })
            }
            _ => None,
        };

        let state = if target.is_some() {
            State::Idle
        } else {
            State::Unconfigured
        };

        Self {
            connector,
            target,
            state: Mutex::new(state),
        }
    }

    pub async fn status(&self) -> PublisherStatus {
        self.state.lock().await.status()
    }

    /// Publish `payload`, connecting first if needed. Never fails.
    pub async fn publish(&self, payload: &EventPayload) -> PublishOutcome {
        let event = payload.event();

        let Some((bus, topic)) = self.connected_bus().await else {
            debug!(event = %event, "event bus not available; event skipped");
            return PublishOutcome::Skipped;
        };

        let message = match serde_json::to_value(payload) {
            Ok(v) => v,
            Err(e) => {
                error!(event = %event, error = %e, "failed to serialize event payload");
                return PublishOutcome::Failed;
            }
        };

        match bus.publish(topic, &message).await {
            Ok(()) => PublishOutcome::Sent,
            Err(e) => {
                error!(event = %event, topic, error = %e, "failed to publish event");
                PublishOutcome::Failed
            }
        }
    }

    /// Flush and release the connection. Safe to call in any state.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;

        match std::mem::replace(&mut *state, State::Idle) {
            State::Connected(bus) => {
                if let Err(e) = bus.flush().await {
                    warn!(error = %e, "failed to flush event bus on close");
                }
                if let Err(e) = bus.close().await {
                    warn!(error = %e, "failed to close event bus");
                }
            }
            other => *state = other,
        }
    }

    /// Returns the live bus, connecting on first use.
    ///
    /// The state lock is held across `connect`, so concurrent first
    /// publishers share a single connection attempt.
    async fn connected_bus(&self) -> Option<(Arc<C::Bus>, &str)> {
        let target = self.target.as_ref()?;
        let mut state = self.state.lock().await;

        if let State::Connected(bus) = &*state {
            return Some((bus.clone(), target.topic.as_str()));
        }
        if !matches!(*state, State::Idle) {
            return None;
        }

        match self.connector.connect(&target.endpoint).await {
            Ok(bus) => {
                let bus = Arc::new(bus);
                *state = State::Connected(bus.clone());
                debug!(endpoint = %target.endpoint, "event bus connected");
                Some((bus, target.topic.as_str()))
            }
            Err(e) => {
                error!(
                    endpoint = %target.endpoint,
                    error = %e,
                    "failed to connect event bus; publisher disabled"
                );
                *state = State::Disabled;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory_bus::{InMemoryConnector, InMemoryEventBus};
    use crate::payload::UserSnapshot;
    use userhub_core::{UserId, UserTypeId};

    fn payload() -> EventPayload {
        EventPayload::created(UserSnapshot {
            id: UserId::from(1),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            user_type_id: Some(UserTypeId::from(1)),
        })
    }

    fn config() -> PublisherConfig {
        PublisherConfig::new("mem://bus", "users")
    }

    #[tokio::test]
    async fn incomplete_config_is_unconfigured() {
        let connector = InMemoryConnector::default();
        let missing_topic = PublisherConfig {
            endpoint: Some("mem://bus".to_string()),
            topic: None,
            enabled: true,
        };
        let publisher = EventPublisher::new(missing_topic, connector.clone());

        assert_eq!(publisher.status().await, PublisherStatus::Unconfigured);
        assert_eq!(publisher.publish(&payload()).await, PublishOutcome::Skipped);
        assert_eq!(connector.attempts(), 0);
    }

    #[tokio::test]
    async fn disabled_flag_wins_over_complete_config() {
        let mut cfg = config();
        cfg.enabled = false;
        let publisher = EventPublisher::new(cfg, InMemoryConnector::default());
        assert_eq!(publisher.status().await, PublisherStatus::Unconfigured);
        assert_eq!(publisher.publish(&payload()).await, PublishOutcome::Skipped);
    }

    #[tokio::test]
    async fn connects_lazily_and_reuses_connection() {
        let bus = Arc::new(InMemoryEventBus::new());
        let connector = InMemoryConnector::new(bus.clone());
        let publisher = EventPublisher::new(config(), connector.clone());

        assert_eq!(publisher.status().await, PublisherStatus::Idle);
        assert_eq!(connector.attempts(), 0);

        assert_eq!(publisher.publish(&payload()).await, PublishOutcome::Sent);
        assert_eq!(publisher.publish(&payload()).await, PublishOutcome::Sent);

        assert_eq!(publisher.status().await, PublisherStatus::Connected);
        assert_eq!(connector.attempts(), 1);

        let published = bus.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].topic, "users");
        assert_eq!(published[0].message["event"], "UserCreated");
    }

    #[tokio::test]
    async fn failed_connect_disables_for_good() {
        let connector = InMemoryConnector::refusing();
        let publisher = EventPublisher::new(config(), connector.clone());

        assert_eq!(publisher.publish(&payload()).await, PublishOutcome::Skipped);
        assert_eq!(publisher.status().await, PublisherStatus::Disabled);

        assert_eq!(publisher.publish(&payload()).await, PublishOutcome::Skipped);
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn send_failure_is_swallowed() {
        let bus = Arc::new(InMemoryEventBus::new());
        bus.set_fail_sends(true);
        let publisher = EventPublisher::new(config(), InMemoryConnector::new(bus.clone()));

        assert_eq!(publisher.publish(&payload()).await, PublishOutcome::Failed);
        assert_eq!(publisher.status().await, PublisherStatus::Connected);
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn close_is_idempotent_and_reconnects_lazily() {
        let bus = Arc::new(InMemoryEventBus::new());
        let connector = InMemoryConnector::new(bus.clone());
        let publisher = EventPublisher::new(config(), connector.clone());

        // Never connected: nothing to release.
        publisher.close().await;
        assert_eq!(publisher.status().await, PublisherStatus::Idle);

        publisher.publish(&payload()).await;
        publisher.close().await;
        publisher.close().await;

        assert_eq!(publisher.status().await, PublisherStatus::Idle);
        assert!(bus.is_closed());
        assert_eq!(bus.flush_count(), 1);

        assert_eq!(publisher.publish(&payload()).await, PublishOutcome::Sent);
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test]
    async fn close_keeps_disabled_state() {
        let publisher = EventPublisher::new(config(), InMemoryConnector::refusing());
        publisher.publish(&payload()).await;
        publisher.close().await;
        assert_eq!(publisher.status().await, PublisherStatus::Disabled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_use_connects_once() {
        let connector = InMemoryConnector::default();
        let publisher = Arc::new(EventPublisher::new(config(), connector.clone()));

        let handles = (0..8)
            .map(|_| {
                let publisher = publisher.clone();
                tokio::spawn(async move { publisher.publish(&payload()).await })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), PublishOutcome::Sent);
        }
        assert_eq!(connector.attempts(), 1);
        assert_eq!(connector.bus().published().len(), 8);
    }

    #[test]
    fn config_completeness() {
        assert!(config().is_complete());
        assert!(!PublisherConfig::disabled().is_complete());
        let blank = PublisherConfig::new("  ", "users");
        assert!(!blank.is_complete());
    }
}
