// crates/placedex-core/src/prune.rs
use crate::error::Result;
use crate::model::PruneReport;
use crate::store::{keys, KvStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Drops category index entries whose place record has expired.
///
/// Only the `locations` index is touched. Prefix sets keep their stale ids;
/// readers filter those out when they resolve a suggestion.
pub struct Pruner<S> {
    store: Arc<S>,
}

impl<S: KvStore> Pruner<S> {
    pub fn new(store: Arc<S>) -> Self {
        Pruner { store }
    }

    pub async fn prune(&self) -> Result<PruneReport> {
        let ids = self.store.hkeys(keys::PLACE_INDEX).await?;
        let mut report = PruneReport {
            checked: ids.len(),
            pruned: 0,
        };

        for id in ids {
            if self.store.exists(&keys::place(&id)).await? {
                continue;
            }
            if self.store.hdel(keys::PLACE_INDEX, &id).await? {
                debug!(%id, "pruned expired place");
                report.pruned += 1;
            }
        }

        info!(checked = report.checked, pruned = report.pruned, "prune finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::Score;
    use crate::store::MemoryStore;
    use std::time::Duration;

    async fn seed(store: &MemoryStore, id: &str, name: &str, ttl: Option<Duration>) {
        let key = keys::place(id);
        store
            .hset_multiple(&key, &[("name".into(), name.into())])
            .await
            .unwrap();
        if let Some(ttl) = ttl {
            store.expire(&key, ttl).await.unwrap();
        }
        store.hset(keys::PLACE_INDEX, id, name).await.unwrap();
        store
            .zadd(&keys::prefix("a"), id, Score::from_u64(1))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn removes_only_expired_entries() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "old", "Albany", Some(Duration::from_secs(10))).await;
        seed(&store, "new", "Austin", Some(Duration::from_secs(1000))).await;
        tokio::time::advance(Duration::from_secs(11)).await;

        let report = Pruner::new(store.clone()).prune().await.unwrap();
        assert_eq!(report, PruneReport { checked: 2, pruned: 1 });
        assert_eq!(store.hkeys(keys::PLACE_INDEX).await.unwrap(), vec!["new"]);
        // Prefix sets and live records are left alone.
        assert_eq!(store.zcard(&keys::prefix("a")).await.unwrap(), 2);
        assert!(store.exists(&keys::place("new")).await.unwrap());
    }

    #[tokio::test]
    async fn live_index_is_untouched() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "1", "Ames", None).await;
        let report = Pruner::new(store.clone()).prune().await.unwrap();
        assert_eq!(report.pruned, 0);
        assert_eq!(store.hkeys(keys::PLACE_INDEX).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_index() {
        let report = Pruner::new(Arc::new(MemoryStore::new())).prune().await.unwrap();
        assert_eq!(report, PruneReport::default());
    }

    #[tokio::test]
    async fn closed_store_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        store.close();
        assert!(Pruner::new(store).prune().await.is_err());
    }
}
