use anyhow::Result;
use cinescope_store::{DatasetCache, MovieStore, PostgresStore, StoreConfig, StoreError};
use polars::prelude::DataFrame;
use tokio::sync::Mutex;

pub struct AppState {
    store: PostgresStore,
    cache: Mutex<DatasetCache>,
}

impl AppState {
    pub async fn new(config: &StoreConfig) -> Result<Self> {
        let store = PostgresStore::connect(config).await?;
        Ok(Self {
            store,
            cache: Mutex::new(DatasetCache::new()),
        })
    }

    /// Full-table replace followed by cache invalidation, so the next
    /// analytics read sees the fresh upload.
    pub async fn replace(&self, df: &DataFrame) -> Result<(), StoreError> {
        self.store.replace(df).await?;
        self.cache.lock().await.mark_stale();
        Ok(())
    }

    /// The session's normalized dataset, loaded at most once per
    /// ingestion generation.
    pub async fn dataset(&self) -> Result<DataFrame, StoreError> {
        self.cache.lock().await.get_or_load(&self.store).await
    }
}
