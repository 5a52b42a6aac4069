//! Basic usage example for placedex
//!
//! This example demonstrates how to:
//! - Plug a custom `Transport` into the rate-limited client
//! - Run one harvest cycle into the in-memory store
//! - Answer a few autocomplete queries

use async_trait::async_trait;
use placedex::prelude::*;
use std::sync::Arc;

/// A tiny canned catalog so the example runs offline.
struct CannedCatalog;

const PLACES: &[(&str, &str, &str)] = &[
    ("ST", "FIPS:53", "Washington"),
    ("ST", "FIPS:54", "West Virginia"),
    ("CNTY", "FIPS:53033", "King County, WA"),
    ("CNTY", "FIPS:11001", "Washington County, DC"),
    ("CITY", "CITY:US530018", "Seattle, WA"),
    ("CITY", "CITY:US110001", "Washington, DC"),
];

#[async_trait]
impl Transport for CannedCatalog {
    async fn send(&self, request: &CatalogRequest, _: &Credential) -> Result<RawResponse> {
        let category = request.param("locationcategoryid").unwrap_or_default();
        let rows: Vec<serde_json::Value> = PLACES
            .iter()
            .filter(|(cat, _, _)| *cat == category)
            .map(|(_, id, name)| serde_json::json!({ "id": id, "name": name }))
            .collect();
        let body = if request.param("offset").is_none() {
            serde_json::json!({ "metadata": { "resultset": { "count": rows.len() } } })
        } else {
            serde_json::json!({ "results": rows })
        };
        Ok(RawResponse {
            status: 200,
            body: body.to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== placedex Basic Usage Example ===\n");

    let settings = Settings::default();
    let store = Arc::new(MemoryStore::new());
    let client = Arc::new(RateLimitedClient::new(CannedCatalog, &settings.client));

    println!("--- Example 1: Harvest ---");
    let harvester = Harvester::new(client, store.clone(), settings.harvest.clone());
    let report = harvester.harvest_cycle().await;
    for c in &report.categories {
        println!("{:<12} {} places", c.category.label(), c.places);
    }
    println!("✓ {} places indexed\n", report.places());

    println!("--- Example 2: Autocomplete ---");
    let engine = AutocompleteEngine::new(store, settings.query.clone());
    for query in ["wash", "washington c", "w", "sea"] {
        let hits = engine.query(query).await?;
        println!("{query:?}:");
        for (i, hit) in hits.iter().enumerate() {
            println!("  {}. {} ({})", i + 1, hit.name, hit.category);
        }
    }

    println!("\n--- Example 3: Known places ---");
    for (id, name) in engine.list_all_known_places().await? {
        println!("{id:<16} {name}");
    }

    Ok(())
}
