//! Relational storage for the `users` and `user_types` tables.
//!
//! `UserStore` is the transactional seam the writer and reader consume. Every
//! call runs in its own transaction (or single statement for reads) and
//! releases its connection on every exit path.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use userhub_core::{NewUser, UserId, UserRecord};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryUserStore;
pub use postgres::PostgresUserStore;

/// Storage operation error.
///
/// These are **infrastructure errors**. When a write fails the transaction is
/// rolled back before the error is returned, so no partial state remains.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The referenced `user_types` row does not exist.
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// The store could not be reached (pool closed, timeout, IO).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Any other database-side failure.
    #[error("database error: {0}")]
    Database(String),

    /// A row could not be decoded into a record.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Transactional access to user rows.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user and return the persisted record with its generated id.
    async fn insert(&self, user: NewUser) -> Result<UserRecord, StorageError>;

    /// Look up and delete a user in one transaction.
    ///
    /// Returns the row as it was before deletion, or `None` when nothing
    /// matched (0 rows affected).
    async fn delete(&self, id: UserId) -> Result<Option<UserRecord>, StorageError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StorageError>;

    /// Release pooled connections. Called once at shutdown.
    async fn close(&self) {}
}

#[async_trait]
impl<S> UserStore for Arc<S>
where
    S: UserStore + ?Sized,
{
    async fn insert(&self, user: NewUser) -> Result<UserRecord, StorageError> {
        (**self).insert(user).await
    }

    async fn delete(&self, id: UserId) -> Result<Option<UserRecord>, StorageError> {
        (**self).delete(id).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StorageError> {
        (**self).find_by_id(id).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}
