//! User lifecycle events: payloads, bus abstraction, and the publisher.

pub mod bus;
pub mod in_memory_bus;
pub mod payload;
pub mod publisher;

pub use bus::{BusConnector, BusError, EventBus, Subscription};
pub use in_memory_bus::{InMemoryConnector, InMemoryEventBus, PublishedMessage};
pub use payload::{EventPayload, UserEventKind, UserSnapshot};
pub use publisher::{EventPublisher, PublishOutcome, PublisherConfig, PublisherStatus};
