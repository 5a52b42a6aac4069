// crates/placedex-core/src/harvest.rs

//! # Harvester
//!
//! One cycle prunes the category index, then pages through every category
//! and upserts each place into three structures:
//!
//! - `loc:{id}`: the place record, expiring after the place TTL;
//! - `locations`: the category index, id → display name;
//! - `sloc:{prefix}`: one score-ordered set per word prefix.
//!
//! Every write is an idempotent upsert keyed by place id, so pages may land
//! in any order and a page harvested twice leaves the store unchanged.

use crate::category::Category;
use crate::client::{CatalogRequest, RateLimitedClient, Transport};
use crate::config::HarvestConfig;
use crate::error::{PlaceError, Result};
use crate::model::{CycleReport, HarvestReport, Place, PruneReport};
use crate::prune::Pruner;
use crate::raw::{CountResponse, PageResponse};
use crate::score::score;
use crate::store::{keys, KvStore};
use crate::text::{fold_key, prefixes, tokenize, MAX_PREFIX_LEN};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// 1-based page offsets covering `count` records.
pub fn page_offsets(count: u64, page_size: u64) -> Vec<u64> {
    if page_size == 0 {
        return Vec::new();
    }
    (1..=count).step_by(page_size as usize).collect()
}

pub struct Harvester<T, S> {
    client: Arc<RateLimitedClient<T>>,
    store: Arc<S>,
    pruner: Pruner<S>,
    config: HarvestConfig,
    categories: Vec<Category>,
}

impl<T, S> Harvester<T, S>
where
    T: Transport + 'static,
    S: KvStore + 'static,
{
    pub fn new(client: Arc<RateLimitedClient<T>>, store: Arc<S>, config: HarvestConfig) -> Self {
        Harvester {
            client,
            pruner: Pruner::new(store.clone()),
            store,
            config,
            categories: Category::ALL.to_vec(),
        }
    }

    /// Restrict the cycle to a subset of categories.
    pub fn with_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    pub fn client(&self) -> &Arc<RateLimitedClient<T>> {
        &self.client
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Prune, then harvest every category concurrently.
    ///
    /// Never fails as a whole: a failed prune, count request or page is
    /// logged and recorded in the report while the rest carries on.
    pub async fn harvest_cycle(&self) -> CycleReport {
        self.client.reset_circuit();
        info!(categories = self.categories.len(), "starting harvest cycle");

        let pruned = match self.pruner.prune().await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "prune failed, harvesting anyway");
                PruneReport::default()
            }
        };

        let categories = join_all(
            self.categories
                .iter()
                .map(|&category| self.harvest_category(category)),
        )
        .await;

        let report = CycleReport { pruned, categories };
        info!(
            places = report.places(),
            pruned = report.pruned.pruned,
            "harvest cycle finished"
        );
        report
    }

    /// Harvest every page of one category.
    pub async fn harvest_category(&self, category: Category) -> HarvestReport {
        let mut report = HarvestReport::new(category);
        info!(%category, "starting location harvest");

        let count = match self.fetch_count(category).await {
            Ok(count) => count,
            Err(e) => {
                warn!(%category, error = %e, "count request failed, skipping category this cycle");
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.expected = Some(count);
        info!(%category, count, "got location count");

        let offsets = page_offsets(count, self.config.page_size);
        let results: Vec<(u64, Result<usize>)> = stream::iter(offsets)
            .map(|offset| async move { (offset, self.harvest_page(category, offset).await) })
            .buffer_unordered(self.config.page_concurrency.max(1))
            .collect()
            .await;

        for (offset, result) in results {
            match result {
                Ok(n) => {
                    report.pages_ok += 1;
                    report.places += n;
                }
                Err(e) => {
                    warn!(%category, offset, error = %e, "error while harvesting page");
                    report.pages_failed += 1;
                }
            }
        }

        info!(
            %category,
            places = report.places,
            pages_ok = report.pages_ok,
            pages_failed = report.pages_failed,
            "location harvest finished"
        );
        report
    }

    async fn fetch_count(&self, category: Category) -> Result<u64> {
        let request = CatalogRequest::count(self.client.config(), category);
        let response: CountResponse = self.client.fetch_json(&request).await?;
        Ok(response.metadata.resultset.count)
    }

    /// Fetch and index the page starting at `offset`. Returns places indexed.
    pub async fn harvest_page(&self, category: Category, offset: u64) -> Result<usize> {
        let request = CatalogRequest::page(self.client.config(), category, offset, self.config.page_size);
        let page: PageResponse = self.client.fetch_json(&request).await?;
        let records = page.results.ok_or_else(|| {
            PlaceError::InvalidData(format!("{category} page at offset {offset} has no results"))
        })?;
        debug!(%category, offset, records = records.len(), "got page");

        let mut indexed = 0;
        for raw in records {
            match Place::from_raw(raw, category) {
                Some(place) => {
                    self.index_place(&place).await?;
                    indexed += 1;
                }
                None => warn!(%category, offset, "skipping record without id or name"),
            }
        }
        Ok(indexed)
    }

    /// Upsert one place: record + TTL, category index entry, prefix entries.
    pub async fn index_place(&self, place: &Place) -> Result<()> {
        let record_key = keys::place(&place.id);
        self.store.hset_multiple(&record_key, &place.to_fields()).await?;
        self.store.expire(&record_key, self.config.place_ttl()).await?;
        self.store
            .hset(keys::PLACE_INDEX, &place.id, &place.name)
            .await?;

        let rank = score(&fold_key(&place.name), place.category.baseline());
        for word in tokenize(&place.name) {
            for prefix in prefixes(&word, MAX_PREFIX_LEN) {
                self.store.zadd(&keys::prefix(prefix), &place.id, rank).await?;
            }
        }
        Ok(())
    }

    /// Wait `initial_delay`, then run a cycle every `period`, forever.
    /// `on_cycle` sees each report as it completes.
    pub async fn run_forever<F>(&self, mut on_cycle: F)
    where
        F: FnMut(&CycleReport) + Send,
    {
        info!(
            delay_secs = self.config.initial_delay_secs,
            period_secs = self.config.period_secs,
            "harvest scheduler started"
        );
        sleep(self.config.initial_delay()).await;

        let mut ticker = interval_at(Instant::now(), self.config.period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let report = self.harvest_cycle().await;
            on_cycle(&report);
        }
    }

    /// Run [`run_forever`](Self::run_forever) on a background task.
    pub fn spawn_scheduler<F>(self: Arc<Self>, on_cycle: F) -> JoinHandle<()>
    where
        F: FnMut(&CycleReport) + Send + 'static,
    {
        tokio::spawn(async move { self.run_forever(on_cycle).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Credential, RawResponse};
    use crate::config::ClientConfig;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves a fixed catalog keyed by upstream category id.
    #[derive(Default)]
    struct Catalog {
        places: HashMap<&'static str, Vec<(&'static str, &'static str)>>,
        calls: AtomicUsize,
        offsets: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for Catalog {
        async fn send(&self, request: &CatalogRequest, _: &Credential) -> Result<RawResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let cat = request.param("locationcategoryid").unwrap_or_default();
            let rows = self.places.get(cat).cloned().unwrap_or_default();
            let body = if request.param("limit") == Some("1") {
                format!(r#"{{"metadata":{{"resultset":{{"count":{}}}}}}}"#, rows.len())
            } else {
                let offset = request.param("offset").unwrap_or("1").to_owned();
                self.offsets.lock().unwrap().push(offset);
                let results: Vec<String> = rows
                    .iter()
                    .map(|(id, name)| format!(r#"{{"id":"{id}","name":"{name}","datacoverage":1}}"#))
                    .collect();
                format!(r#"{{"results":[{}]}}"#, results.join(","))
            };
            Ok(RawResponse { status: 200, body })
        }
    }

    fn harvester(catalog: Catalog) -> Harvester<Catalog, MemoryStore> {
        let config = ClientConfig {
            token: "t".into(),
            requests_per_second: 1000,
            ..ClientConfig::default()
        };
        let client = Arc::new(RateLimitedClient::new(catalog, &config));
        Harvester::new(client, Arc::new(MemoryStore::new()), HarvestConfig::default())
    }

    #[test]
    fn offsets_step_by_page_size() {
        assert_eq!(page_offsets(0, 1000), Vec::<u64>::new());
        assert_eq!(page_offsets(1, 1000), vec![1]);
        assert_eq!(page_offsets(1000, 1000), vec![1]);
        assert_eq!(page_offsets(1001, 1000), vec![1, 1001]);
        assert_eq!(page_offsets(2500, 1000), vec![1, 1001, 2001]);
    }

    #[tokio::test]
    async fn index_place_writes_all_three_structures() {
        let h = harvester(Catalog::default());
        let place = Place {
            id: "2".into(),
            name: "Washington County".into(),
            category: Category::County,
            attributes: Default::default(),
        };
        h.index_place(&place).await.unwrap();

        let store = h.store();
        assert_eq!(store.hget("loc:2", "name").await.unwrap().as_deref(), Some("Washington County"));
        assert_eq!(store.hget("loc:2", "category").await.unwrap().as_deref(), Some("county"));
        assert_eq!(store.hget("locations", "2").await.unwrap().as_deref(), Some("Washington County"));
        for key in ["sloc:w", "sloc:washington", "sloc:c", "sloc:county"] {
            assert_eq!(store.zcard(key).await.unwrap(), 1, "{key}");
        }
        assert_eq!(store.zcard("sloc:washington county").await.unwrap(), 0);
        assert_eq!(
            store.zscore("sloc:wash", "2").await.unwrap(),
            Some(score("washington county", 4))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn records_expire_after_ttl_but_index_survives() {
        let h = harvester(Catalog::default());
        let place = Place {
            id: "1".into(),
            name: "Ohio".into(),
            category: Category::State,
            attributes: Default::default(),
        };
        h.index_place(&place).await.unwrap();
        tokio::time::advance(Duration::from_secs(48 * 3600 + 1)).await;

        let store = h.store();
        assert!(!store.exists("loc:1").await.unwrap());
        assert_eq!(store.hget("locations", "1").await.unwrap().as_deref(), Some("Ohio"));
        assert_eq!(store.zcard("sloc:oh").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn prefixes_stop_at_thirty_chars() {
        let h = harvester(Catalog::default());
        let word = "a".repeat(40);
        let place = Place {
            id: "long".into(),
            name: word.clone(),
            category: Category::City,
            attributes: Default::default(),
        };
        h.index_place(&place).await.unwrap();

        let store = h.store();
        assert!(store.exists(&keys::prefix(&word[..30])).await.unwrap());
        assert!(!store.exists(&keys::prefix(&word[..31])).await.unwrap());
        assert!(!store.exists(&keys::prefix(&word)).await.unwrap());

        // The query side cuts the same word at the same length.
        let engine = crate::AutocompleteEngine::new(store.clone(), Default::default());
        let hits = engine.query(&word).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, word);
    }

    #[tokio::test]
    async fn harvesting_twice_is_idempotent() {
        let mut catalog = Catalog::default();
        catalog
            .places
            .insert("ST", vec![("1", "Washington"), ("3", "West Virginia")]);
        let h = harvester(catalog).with_categories([Category::State]);

        h.harvest_category(Category::State).await;
        let first = h.store().stats();
        let first_rank = h.store().zscore("sloc:w", "3").await.unwrap();

        h.harvest_category(Category::State).await;
        assert_eq!(h.store().stats(), first);
        assert_eq!(h.store().zscore("sloc:w", "3").await.unwrap(), first_rank);
        assert_eq!(h.store().zcard("sloc:w").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn category_report_counts_pages() {
        let mut catalog = Catalog::default();
        catalog.places.insert("CITY", vec![("c1", "Boston"), ("c2", "Denver")]);
        let h = harvester(catalog);

        let report = h.harvest_category(Category::City).await;
        assert_eq!(report.expected, Some(2));
        assert_eq!(report.places, 2);
        assert_eq!(report.pages_ok, 1);
        assert!(report.is_complete());
        assert_eq!(*h.client().transport().offsets.lock().unwrap(), vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn empty_category_issues_only_the_count_request() {
        let h = harvester(Catalog::default());
        let report = h.harvest_category(Category::Country).await;
        assert_eq!(report.expected, Some(0));
        assert_eq!(report.pages_ok + report.pages_failed, 0);
        assert_eq!(h.client().transport().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_waits_then_repeats() {
        let mut catalog = Catalog::default();
        catalog.places.insert("ST", vec![("1", "Utah")]);
        let h = Arc::new(harvester(catalog).with_categories([Category::State]));
        let cycles = Arc::new(AtomicUsize::new(0));

        let seen = cycles.clone();
        let handle = h.clone().spawn_scheduler(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(59 * 60)).await;
        assert_eq!(cycles.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2 * 60)).await;
        assert_eq!(cycles.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(12 * 3600)).await;
        assert_eq!(cycles.load(Ordering::SeqCst), 2);

        handle.abort();
    }
}
