//! User write path: validate → persist → commit → publish → log.
//!
//! The event is published strictly after the store commits. A crash between
//! commit and publish loses the event; there is no outbox. Publish failures
//! never reach the caller (see `EventPublisher`).

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use userhub_core::{DomainError, NewUser, RawUserTypeId, UserId};
use userhub_events::{BusConnector, EventPayload, EventPublisher, UserSnapshot};

use crate::storage::{StorageError, UserStore};

/// Error returned by `UserWriter`.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Caller input was rejected before touching the store.
    #[error(transparent)]
    InvalidArgument(#[from] DomainError),

    /// The store failed; the transaction was rolled back.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Persists and deletes users, emitting lifecycle events after commit.
///
/// The publisher is injected and shared; its lifecycle (construction at
/// startup, `close()` at shutdown) belongs to the caller.
#[derive(Debug)]
pub struct UserWriter<S, C: BusConnector> {
    store: S,
    publisher: Arc<EventPublisher<C>>,
}

impl<S, C: BusConnector> UserWriter<S, C> {
    pub fn new(store: S, publisher: Arc<EventPublisher<C>>) -> Self {
        Self { store, publisher }
    }
}

impl<S, C> UserWriter<S, C>
where
    S: UserStore,
    C: BusConnector,
{
    /// Insert a user and publish `UserCreated`. Returns the generated id.
    ///
    /// `user_type_id` defaults to 1 when absent; it must coerce to a positive
    /// integer. Whether the type exists is left to the store's foreign key.
    pub async fn add(
        &self,
        name: &str,
        email: &str,
        user_type_id: Option<RawUserTypeId>,
    ) -> Result<UserId, WriteError> {
        let new_user = NewUser::try_new(name, email, user_type_id)?;

        let user = self.store.insert(new_user).await?;

        let outcome = self
            .publisher
            .publish(&EventPayload::created(UserSnapshot::from(&user)))
            .await;
        debug!(user_id = %user.id, outcome = ?outcome, "user created");

        Ok(user.id)
    }

    /// Delete a user and publish `UserDeleted`.
    ///
    /// Returns the number of rows affected: 0 when the user did not exist
    /// (no event is emitted), 1 otherwise.
    pub async fn delete(&self, user_id: UserId) -> Result<u64, WriteError> {
        let Some(deleted) = self.store.delete(user_id).await? else {
            return Ok(0);
        };

        let outcome = self
            .publisher
            .publish(&EventPayload::deleted(UserSnapshot::from(&deleted)))
            .await;
        debug!(user_id = %user_id, outcome = ?outcome, "user deleted");

        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryUserStore;
    use userhub_events::{InMemoryConnector, InMemoryEventBus, PublisherConfig};

    fn writer_with_bus() -> (
        UserWriter<Arc<InMemoryUserStore>, InMemoryConnector>,
        Arc<InMemoryUserStore>,
        Arc<InMemoryEventBus>,
    ) {
        let store = Arc::new(InMemoryUserStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let publisher = Arc::new(EventPublisher::new(
            PublisherConfig::new("mem://bus", "users"),
            InMemoryConnector::new(bus.clone()),
        ));
        (UserWriter::new(store.clone(), publisher), store, bus)
    }

    #[tokio::test]
    async fn add_rejects_invalid_input_without_touching_store() {
        let (writer, store, bus) = writer_with_bus();

        for (name, email, type_id) in [
            ("", "x@y.com", 1i64),
            ("x", "", 1),
            ("x", "y@z.com", 0),
            ("x", "y@z.com", -5),
        ] {
            let err = writer.add(name, email, Some(type_id.into())).await.unwrap_err();
            assert!(matches!(err, WriteError::InvalidArgument(DomainError::InvalidArgument(_))));
        }

        assert_eq!(store.user_count(), 0);
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn add_rejects_non_numeric_user_type() {
        let (writer, _store, _bus) = writer_with_bus();
        let err = writer.add("x", "y@z.com", Some("admin".into())).await.unwrap_err();
        assert!(matches!(err, WriteError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn add_emits_one_created_event_matching_the_id() {
        let (writer, _store, bus) = writer_with_bus();

        let id = writer.add("Ada", "ada@example.com", None).await.unwrap();

        let published = bus.published();
        assert_eq!(published.len(), 1);
        let message = &published[0].message;
        assert_eq!(message["event"], "UserCreated");
        assert_eq!(message["id"], id.as_i64());
        assert_eq!(message["user_type_id"], 1);
        assert!(message.get("deletion_date").is_none());
    }

    #[tokio::test]
    async fn storage_error_propagates_and_emits_nothing() {
        let (writer, store, bus) = writer_with_bus();
        store.set_unavailable(true);

        let err = writer.add("Ada", "ada@example.com", None).await.unwrap_err();
        assert!(matches!(err, WriteError::Storage(StorageError::Unavailable(_))));
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn unknown_user_type_is_rejected_by_the_store() {
        let (writer, _store, bus) = writer_with_bus();

        let err = writer.add("Ada", "ada@example.com", Some(42i64.into())).await.unwrap_err();
        assert!(matches!(err, WriteError::Storage(StorageError::ForeignKeyViolation(_))));
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn delete_existing_emits_snapshot_with_deletion_date() {
        let (writer, _store, bus) = writer_with_bus();
        let id = writer.add("Ada", "ada@example.com", Some(2i64.into())).await.unwrap();

        assert_eq!(writer.delete(id).await.unwrap(), 1);

        let published = bus.published();
        assert_eq!(published.len(), 2);
        let message = &published[1].message;
        assert_eq!(message["event"], "UserDeleted");
        assert_eq!(message["id"], id.as_i64());
        assert_eq!(message["name"], "Ada");
        assert_eq!(message["email"], "ada@example.com");
        assert_eq!(message["user_type_id"], 2);
        assert!(message["deletion_date"].is_string());
    }

    #[tokio::test]
    async fn delete_missing_returns_zero_and_emits_nothing() {
        let (writer, _store, bus) = writer_with_bus();
        assert_eq!(writer.delete(UserId::from(404)).await.unwrap(), 0);
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn writes_succeed_when_bus_refuses_connections() {
        let store = Arc::new(InMemoryUserStore::new());
        let publisher = Arc::new(EventPublisher::new(
            PublisherConfig::new("mem://bus", "users"),
            InMemoryConnector::refusing(),
        ));
        let writer = UserWriter::new(store.clone(), publisher);

        let id = writer.add("Ada", "ada@example.com", None).await.unwrap();
        assert_eq!(writer.delete(id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn writes_succeed_when_sends_fail() {
        let (writer, _store, bus) = writer_with_bus();
        bus.set_fail_sends(true);

        let id = writer.add("Ada", "ada@example.com", None).await.unwrap();
        assert_eq!(writer.delete(id).await.unwrap(), 1);
        assert!(bus.published().is_empty());
    }
}
