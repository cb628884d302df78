//! User read path.

use tracing::debug;

use userhub_core::{UserId, UserRecord};

use crate::storage::{StorageError, UserStore};

/// Looks up single users.
///
/// "Not found" is a normal result (`None`), not an error; only storage
/// failures are returned as `Err`. A found record serializes as the flat
/// `{id, name, email, user_type_id}` mapping.
#[derive(Debug)]
pub struct UserReader<S> {
    store: S,
}

impl<S: UserStore> UserReader<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, StorageError> {
        let user = self.store.find_by_id(user_id).await?;
        if user.is_none() {
            debug!(user_id = %user_id, "user not found");
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use userhub_core::NewUser;

    use crate::storage::InMemoryUserStore;

    #[tokio::test]
    async fn returns_flat_mapping_for_existing_user() {
        let store = Arc::new(InMemoryUserStore::new());
        let user = store
            .insert(NewUser::try_new("Ada", "ada@example.com", Some(3i64.into())).unwrap())
            .await
            .unwrap();
        let reader = UserReader::new(store);

        let found = reader.get_by_id(user.id).await.unwrap().unwrap();
        let json = serde_json::to_value(&found).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": user.id.as_i64(),
                "name": "Ada",
                "email": "ada@example.com",
                "user_type_id": 3
            })
        );
    }

    #[tokio::test]
    async fn missing_user_is_none_not_error() {
        let reader = UserReader::new(InMemoryUserStore::new());
        assert_eq!(reader.get_by_id(UserId::from(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn storage_failure_propagates() {
        let store = InMemoryUserStore::new();
        store.set_unavailable(true);
        let reader = UserReader::new(store);
        assert!(matches!(
            reader.get_by_id(UserId::from(1)).await,
            Err(StorageError::Unavailable(_))
        ));
    }
}
