// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Load-once cache of classified datasets, keyed by date range.

use crate::classifier::MetricClassifier;
use crate::descriptor::MetricDescriptor;
use crate::error::CacheError;
use crate::summary::DatasetOverview;
use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

pub const DEFAULT_KEY: &str = "default";
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_CAPACITY: u64 = 100;

/// Source of raw finance datasets, usually a remote metrics API.
#[async_trait]
pub trait DatasetLoader: Send + Sync {
    async fn load(&self, date_range: Option<&str>) -> anyhow::Result<Value>;
}

/// A dataset together with its classification, computed once per load.
#[derive(Debug, Clone)]
pub struct CachedDataset {
    pub dataset: Value,
    pub descriptors: Vec<MetricDescriptor>,
    pub overview: DatasetOverview,
}

pub struct DatasetCache<L> {
    loader: Arc<L>,
    classifier: MetricClassifier,
    entries: Cache<String, Arc<CachedDataset>>,
}

impl<L: DatasetLoader + 'static> DatasetCache<L> {
    pub fn new(loader: L, classifier: MetricClassifier) -> Self {
        Self::with_limits(loader, classifier, DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    pub fn with_limits(loader: L, classifier: MetricClassifier, ttl: Duration, capacity: u64) -> Self {
        Self {
            loader: Arc::new(loader),
            classifier,
            entries: Cache::builder().max_capacity(capacity).time_to_live(ttl).build(),
        }
    }

    /// Returns the cached entry for `date_range`, loading and classifying it
    /// on a miss. Concurrent misses for one key share a single load.
    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, date_range: Option<&str>) -> Result<Arc<CachedDataset>, CacheError> {
        let key = cache_key(date_range);
        let loader = Arc::clone(&self.loader);
        let classifier = self.classifier.clone();
        let range = date_range.map(str::to_string);
        let load_key = key.clone();
        self.entries
            .try_get_with(key.clone(), async move {
                let dataset = loader.load(range.as_deref()).await?;
                let descriptors = classifier.classify(&dataset);
                let overview = DatasetOverview::build(&dataset, &descriptors);
                info!(key = %load_key, metric_count = descriptors.len(), "Loaded and classified dataset");
                Ok::<_, anyhow::Error>(Arc::new(CachedDataset {
                    dataset,
                    descriptors,
                    overview,
                }))
            })
            .await
            .map_err(|error| CacheError::LoadFailed {
                key,
                reason: format!("{error:#}"),
            })
    }

    pub async fn invalidate(&self, date_range: Option<&str>) {
        let key = cache_key(date_range);
        debug!(key = %key, "Invalidating cached dataset");
        self.entries.invalidate(&key).await;
    }

    /// Entries currently held, counted after pending maintenance has run.
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}

fn cache_key(date_range: Option<&str>) -> String {
    match date_range.map(str::trim) {
        Some(range) if !range.is_empty() => range.to_string(),
        _ => DEFAULT_KEY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DatasetLoader for CountingLoader {
        async fn load(&self, date_range: Option<&str>) -> anyhow::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if date_range == Some("broken") {
                anyhow::bail!("upstream returned 502");
            }
            Ok(json!({"revenue": [{"date": "2025-01", "value": 10}]}))
        }
    }

    fn cache() -> (DatasetCache<CountingLoader>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = CountingLoader { calls: Arc::clone(&calls) };
        (DatasetCache::new(loader, MetricClassifier::default()), calls)
    }

    #[tokio::test]
    async fn loads_once_per_key() {
        let (cache, calls) = cache();
        let first = cache.get(None).await.unwrap();
        let second = cache.get(Some("")).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.descriptors.len(), 1);
        assert_eq!(first.overview.total_metrics, 1);

        cache.get(Some("2025")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.entry_count().await, 2);
    }

    #[tokio::test]
    async fn invalidation_forces_reload() {
        let (cache, calls) = cache();
        cache.get(Some("2025")).await.unwrap();
        cache.invalidate(Some("2025")).await;
        assert_eq!(cache.entry_count().await, 0);
        cache.get(Some("2025")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn loader_failures_are_reported_with_key() {
        let (cache, _) = cache();
        match cache.get(Some("broken")).await {
            Err(CacheError::LoadFailed { key, reason }) => {
                assert_eq!(key, "broken");
                assert!(reason.contains("502"));
            }
            Ok(_) => panic!("expected a load failure"),
        }
    }
}
