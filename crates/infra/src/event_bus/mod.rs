//! Infrastructure event bus implementations.
//!
//! The bus abstraction and the publisher live in `userhub-events` as pure
//! mechanics. This module provides broker-backed implementations.

#[cfg(feature = "redis")]
pub mod redis_pubsub;

#[cfg(feature = "redis")]
pub use redis_pubsub::{RedisConnector, RedisPubSubBus};
