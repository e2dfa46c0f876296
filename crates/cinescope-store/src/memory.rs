//! In-memory store used to exercise the pipeline without Postgres.

use async_trait::async_trait;
use polars::prelude::DataFrame;
use tokio::sync::Mutex;

use crate::{MovieStore, StoreError};

/// Single-slot store mirroring the replace/load contract.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<DataFrame>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MovieStore for MemoryStore {
    async fn replace(&self, df: &DataFrame) -> Result<(), StoreError> {
        *self.slot.lock().await = Some(df.clone());
        Ok(())
    }

    async fn load(&self) -> Result<DataFrame, StoreError> {
        self.slot
            .lock()
            .await
            .clone()
            .ok_or_else(|| StoreError::MissingRelation("memory".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use polars::prelude::*;

    use super::MemoryStore;
    use crate::{MovieStore, StoreError};

    fn text_frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("Movie name".into(), vec!["A", "B"]).into(),
            Series::new("Ratings".into(), vec!["8.0", "6.5"]).into(),
        ])
        .expect("frame")
    }

    #[tokio::test]
    async fn replace_then_load_round_trips() {
        let store = MemoryStore::new();
        let df = text_frame();
        store.replace(&df).await.expect("replace failed");
        let loaded = store.load().await.expect("load failed");
        assert!(loaded.equals_missing(&df));
    }

    #[tokio::test]
    async fn zero_row_replace_still_replaces() {
        let store = MemoryStore::new();
        store.replace(&text_frame()).await.expect("replace failed");

        let empty = text_frame().head(Some(0));
        store.replace(&empty).await.expect("empty replace failed");

        let loaded = store.load().await.expect("load failed");
        assert_eq!(loaded.height(), 0);
        assert_eq!(loaded.width(), 2);
    }

    #[tokio::test]
    async fn load_before_any_ingest_is_an_error() {
        let store = MemoryStore::new();
        let err = store.load().await.expect_err("load should fail");
        assert!(matches!(err, StoreError::MissingRelation(_)));
    }
}
