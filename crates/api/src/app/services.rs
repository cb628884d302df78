//! Service wiring: one store and one publisher per process.

use std::sync::Arc;

use tracing::warn;

use userhub_events::{BusConnector, EventPublisher};
use userhub_infra::{
    AppConfig, InMemoryUserStore, PostgresUserStore, StorageError, UserReader, UserStore,
    UserWriter,
};

pub type SharedStore = Arc<dyn UserStore>;

/// Writer and reader sharing one store and one publisher.
pub struct AppServices<C: BusConnector> {
    store: SharedStore,
    writer: UserWriter<SharedStore, C>,
    reader: UserReader<SharedStore>,
    publisher: Arc<EventPublisher<C>>,
}

impl<C: BusConnector> AppServices<C> {
    pub fn new(store: SharedStore, publisher: Arc<EventPublisher<C>>) -> Self {
        Self {
            writer: UserWriter::new(store.clone(), publisher.clone()),
            reader: UserReader::new(store.clone()),
            store,
            publisher,
        }
    }

    pub fn writer(&self) -> &UserWriter<SharedStore, C> {
        &self.writer
    }

    pub fn reader(&self) -> &UserReader<SharedStore> {
        &self.reader
    }

    /// Flush and close the publisher, then release the store's connections.
    pub async fn shutdown(&self) {
        self.publisher.close().await;
        self.store.close().await;
    }
}

/// Postgres when `DATABASE_URL` is set, otherwise an in-memory store (dev only).
pub async fn build_store(config: &AppConfig) -> Result<SharedStore, StorageError> {
    match config.database_url.as_deref() {
        Some(url) => Ok(Arc::new(PostgresUserStore::connect(url).await?)),
        None => {
            warn!("DATABASE_URL not set; using in-memory user store (data is not persisted)");
            Ok(Arc::new(InMemoryUserStore::new()))
        }
    }
}
