// crates/placedex-core/tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use placedex_core::client::{Credential, RawResponse};
use placedex_core::{
    CatalogRequest, Category, ClientConfig, HarvestConfig, Harvester, MemoryStore, PlaceError,
    RateLimitedClient, Result, Transport,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const BURST_BODY: &str =
    r#"{"status":"429","message":"This token has reached its temporary request limit of 5 per second."}"#;
pub const QUOTA_BODY: &str =
    r#"{"status":"429","message":"This token has reached its request limit of 1000 per day."}"#;

/// How a single page request should fail.
#[derive(Debug, Clone, Copy)]
pub enum PageFailure {
    Quota,
    Transport,
}

/// In-process stand-in for the catalog API.
///
/// Serves `count` and paged `results` per category, can answer a category
/// (or single pages of it) with the daily-quota reply or a transport error,
/// and can throttle the first few calls.
#[derive(Default)]
pub struct FakeCatalog {
    rows: HashMap<String, Vec<Value>>,
    quota: HashSet<String>,
    page_failures: HashMap<(String, u64), PageFailure>,
    bursts_left: AtomicUsize,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<CatalogRequest>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(mut self, category: Category, id: &str, name: &str) -> Self {
        self.rows
            .entry(category.upstream_id().to_owned())
            .or_default()
            .push(json!({ "id": id, "name": name, "datacoverage": 1, "mindate": "1900-01-01" }));
        self
    }

    pub fn with_raw(mut self, category: Category, row: Value) -> Self {
        self.rows
            .entry(category.upstream_id().to_owned())
            .or_default()
            .push(row);
        self
    }

    pub fn with_quota_exhausted(mut self, category: Category) -> Self {
        self.quota.insert(category.upstream_id().to_owned());
        self
    }

    /// Fail only the page of `category` starting at `offset`.
    pub fn with_page_failure(mut self, category: Category, offset: u64, failure: PageFailure) -> Self {
        self.page_failures
            .insert((category.upstream_id().to_owned(), offset), failure);
        self
    }

    fn page_failure(&self, request: &CatalogRequest) -> Option<PageFailure> {
        let category = request.param("locationcategoryid")?;
        let offset: u64 = request.param("offset")?.parse().ok()?;
        self.page_failures.get(&(category.to_owned(), offset)).copied()
    }

    pub fn with_bursts(self, n: usize) -> Self {
        self.bursts_left.store(n, Ordering::SeqCst);
        self
    }

    fn respond(&self, request: &CatalogRequest) -> String {
        let category = request.param("locationcategoryid").unwrap_or_default();
        if self.quota.contains(category) {
            return QUOTA_BODY.to_owned();
        }
        let rows = self.rows.get(category).map(Vec::as_slice).unwrap_or_default();
        let limit: usize = request.param("limit").and_then(|v| v.parse().ok()).unwrap_or(25);

        if request.param("offset").is_none() && limit == 1 {
            return json!({ "metadata": { "resultset": { "offset": 1, "count": rows.len(), "limit": 1 } } })
                .to_string();
        }

        let offset: usize = request.param("offset").and_then(|v| v.parse().ok()).unwrap_or(1);
        let page: Vec<Value> = rows.iter().skip(offset.saturating_sub(1)).take(limit).cloned().collect();
        if page.is_empty() {
            return "{}".to_owned();
        }
        json!({ "results": page }).to_string()
    }
}

#[async_trait]
impl Transport for FakeCatalog {
    async fn send(&self, request: &CatalogRequest, _credential: &Credential) -> Result<RawResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());

        let throttled = self
            .bursts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let body = if throttled {
            BURST_BODY.to_owned()
        } else {
            match self.page_failure(request) {
                Some(PageFailure::Quota) => QUOTA_BODY.to_owned(),
                Some(PageFailure::Transport) => {
                    return Err(PlaceError::Transport("connection reset by peer".into()))
                }
                None => self.respond(request),
            }
        };
        Ok(RawResponse { status: 200, body })
    }
}

pub fn client_config() -> ClientConfig {
    ClientConfig {
        token: "test-token".into(),
        requests_per_second: 1_000,
        ..ClientConfig::default()
    }
}

pub fn harvester(
    catalog: FakeCatalog,
    harvest: HarvestConfig,
) -> (Arc<MemoryStore>, Harvester<FakeCatalog, MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let client = Arc::new(RateLimitedClient::new(catalog, &client_config()));
    (store.clone(), Harvester::new(client, store, harvest))
}
