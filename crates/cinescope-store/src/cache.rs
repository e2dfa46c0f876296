//! Single-slot analytics cache keyed by a load generation.

use cinescope_core::normalize_numeric_columns;
use cinescope_core::schema::NUMERIC_COLUMNS;
use polars::prelude::DataFrame;
use tracing::debug;

use crate::{MovieStore, StoreError};

/// Caches one normalized dataset per session. Each successful ingestion
/// bumps the generation via [`DatasetCache::mark_stale`], so the next
/// read reloads instead of serving the pre-ingest snapshot forever.
#[derive(Default)]
pub struct DatasetCache {
    generation: u64,
    slot: Option<CachedDataset>,
}

struct CachedDataset {
    generation: u64,
    frame: DataFrame,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Invalidates the cached snapshot. Called after a replace succeeds.
    pub fn mark_stale(&mut self) {
        self.generation += 1;
        self.slot = None;
    }

    /// Returns the cached dataset, filling the slot on a miss. The fill
    /// path is the one place the column normalizer runs: every frame
    /// handed out has its numeric columns coerced already.
    pub async fn get_or_load(&mut self, store: &dyn MovieStore) -> Result<DataFrame, StoreError> {
        if let Some(cached) = &self.slot {
            if cached.generation == self.generation {
                return Ok(cached.frame.clone());
            }
        }

        let raw = store.load().await?;
        let frame = normalize_numeric_columns(&raw, &NUMERIC_COLUMNS)?;
        debug!(generation = self.generation, rows = frame.height(), "dataset cached");
        self.slot = Some(CachedDataset {
            generation: self.generation,
            frame: frame.clone(),
        });
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use polars::prelude::*;

    use super::DatasetCache;
    use crate::{MemoryStore, MovieStore, StoreError};

    struct CountingStore {
        inner: MemoryStore,
        loads: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                loads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MovieStore for CountingStore {
        async fn replace(&self, df: &DataFrame) -> Result<(), StoreError> {
            self.inner.replace(df).await
        }

        async fn load(&self) -> Result<DataFrame, StoreError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load().await
        }
    }

    fn text_frame(rating: &str) -> DataFrame {
        DataFrame::new(vec![
            Series::new("Movie name".into(), vec!["A"]).into(),
            Series::new("Ratings".into(), vec![rating]).into(),
        ])
        .expect("frame")
    }

    #[tokio::test]
    async fn cache_serves_slot_until_marked_stale() {
        let store = CountingStore::new();
        store.replace(&text_frame("8.0")).await.expect("replace");

        let mut cache = DatasetCache::new();
        cache.get_or_load(&store).await.expect("first load");
        cache.get_or_load(&store).await.expect("cached load");
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);

        store.replace(&text_frame("9.0")).await.expect("replace");
        // Without invalidation the stale snapshot keeps being served.
        let stale = cache.get_or_load(&store).await.expect("stale load");
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);
        let ratings = stale.column("Ratings").unwrap().f64().unwrap();
        assert_eq!(ratings.get(0), Some(8.0));

        cache.mark_stale();
        let fresh = cache.get_or_load(&store).await.expect("fresh load");
        assert_eq!(store.loads.load(Ordering::SeqCst), 2);
        let ratings = fresh.column("Ratings").unwrap().f64().unwrap();
        assert_eq!(ratings.get(0), Some(9.0));
    }

    #[tokio::test]
    async fn cache_normalizes_exactly_once_per_fill() {
        let store = CountingStore::new();
        store.replace(&text_frame("not a number")).await.expect("replace");

        let mut cache = DatasetCache::new();
        let frame = cache.get_or_load(&store).await.expect("load");

        let ratings = frame.column("Ratings").unwrap().f64().unwrap();
        assert_eq!(ratings.get(0), None);
    }
}
