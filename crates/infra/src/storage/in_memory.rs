//! In-memory user store for tests/dev.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use userhub_core::{NewUser, UserId, UserRecord, UserTypeId, UserTypeRecord};

use super::{StorageError, UserStore};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, UserRecord>,
    user_types: BTreeMap<UserTypeId, UserTypeRecord>,
    last_user_id: i64,
}

/// In-memory tables with auto-increment ids and an enforced foreign key.
///
/// Each call takes the table lock once, so it is atomic the way a single
/// transaction is. `set_unavailable(true)` makes every call fail with
/// `StorageError::Unavailable`, which tests use to exercise error paths.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryUserStore {
    /// Store seeded with the standard user types (1 = Client, 2 = Employee, 3 = Manager).
    pub fn new() -> Self {
        Self::with_user_types(default_user_types())
    }

    pub fn with_user_types(user_types: impl IntoIterator<Item = UserTypeRecord>) -> Self {
        let store = Self::default();
        if let Ok(mut tables) = store.tables.write() {
            tables.user_types = user_types.into_iter().map(|t| (t.id, t)).collect();
        }
        store
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of user rows currently stored.
    pub fn user_count(&self) -> usize {
        self.tables.read().map(|t| t.users.len()).unwrap_or(0)
    }

    fn check_available(&self, operation: &str) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!(
                "store offline in {operation}"
            )));
        }
        Ok(())
    }

    fn poisoned(operation: &str) -> StorageError {
        StorageError::Unavailable(format!("lock poisoned in {operation}"))
    }
}

fn default_user_types() -> Vec<UserTypeRecord> {
    [(1, "Client"), (2, "Employee"), (3, "Manager")]
        .into_iter()
        .filter_map(|(id, name)| UserTypeRecord::new(UserTypeId::from_i64(id), name).ok())
        .collect()
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<UserRecord, StorageError> {
        self.check_available("insert_user")?;
        let mut tables = self
            .tables
            .write()
            .map_err(|_| Self::poisoned("insert_user"))?;

        if !tables.user_types.contains_key(&user.user_type_id()) {
            return Err(StorageError::ForeignKeyViolation(format!(
                "user_type_id {} does not reference an existing user type",
                user.user_type_id()
            )));
        }

        tables.last_user_id += 1;
        let record = user.into_record(UserId::from_i64(tables.last_user_id));
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete(&self, id: UserId) -> Result<Option<UserRecord>, StorageError> {
        self.check_available("delete_user")?;
        let mut tables = self
            .tables
            .write()
            .map_err(|_| Self::poisoned("delete_user"))?;
        Ok(tables.users.remove(&id))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StorageError> {
        self.check_available("find_user")?;
        let tables = self.tables.read().map_err(|_| Self::poisoned("find_user"))?;
        Ok(tables.users.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(type_id: i64) -> NewUser {
        NewUser::try_new("Ada", "ada@example.com", Some(type_id.into())).unwrap()
    }

    #[tokio::test]
    async fn ids_are_generated_and_unique() {
        let store = InMemoryUserStore::new();
        let a = store.insert(new_user(1)).await.unwrap();
        let b = store.insert(new_user(2)).await.unwrap();
        assert!(a.id.as_i64() > 0);
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = InMemoryUserStore::new();
        let a = store.insert(new_user(1)).await.unwrap();
        store.delete(a.id).await.unwrap();
        let b = store.insert(new_user(1)).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn unknown_user_type_violates_foreign_key() {
        let store = InMemoryUserStore::new();
        let err = store.insert(new_user(99)).await.unwrap_err();
        assert!(matches!(err, StorageError::ForeignKeyViolation(_)));
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn delete_returns_pre_delete_row() {
        let store = InMemoryUserStore::new();
        let user = store.insert(new_user(3)).await.unwrap();

        let deleted = store.delete(user.id).await.unwrap();
        assert_eq!(deleted, Some(user.clone()));
        assert_eq!(store.delete(user.id).await.unwrap(), None);
        assert_eq!(store.find_by_id(user.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn seeded_user_types_accept_inserts() {
        let store = InMemoryUserStore::new();
        for type_id in 1..=3 {
            let user = store.insert(new_user(type_id)).await.unwrap();
            assert_eq!(user.user_type_id.as_i64(), type_id);
        }
        assert!(store.insert(new_user(4)).await.is_err());
        assert_eq!(store.user_count(), 3);
    }

    #[tokio::test]
    async fn custom_user_types_replace_seeds() {
        let auditor = UserTypeRecord::new(UserTypeId::from_i64(7), "Auditor").unwrap();
        let store = InMemoryUserStore::with_user_types([auditor]);
        assert!(store.insert(new_user(7)).await.is_ok());
        assert!(matches!(
            store.insert(new_user(1)).await,
            Err(StorageError::ForeignKeyViolation(_))
        ));
    }

    #[tokio::test]
    async fn close_through_shared_handle_is_a_no_op() {
        let store: std::sync::Arc<dyn UserStore> = std::sync::Arc::new(InMemoryUserStore::new());
        store.close().await;
        assert!(store.insert(new_user(1)).await.is_ok());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryUserStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.insert(new_user(1)).await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(matches!(
            store.find_by_id(UserId::from(1)).await,
            Err(StorageError::Unavailable(_))
        ));
    }
}
