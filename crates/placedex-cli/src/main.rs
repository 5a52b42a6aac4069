//! placedex: command-line runner for placedex-core
//!
//! Harvests the catalog into an in-memory prefix index (persisted as a
//! snapshot file between runs) and answers autocomplete queries.
//!
//! Usage examples
//! --------------
//!
//! - Harvest once and keep the result
//!   $ placedex --snapshot places.bin harvest
//!
//! - Query the snapshot
//!   $ placedex --snapshot places.bin query "wash"
//!
//! - Long-running mode: scheduler in the background, queries on stdin
//!   $ placedex --snapshot places.bin run
//!
//! - Inspect the score of a name
//!   $ placedex score "Washington" --baseline 2
//!
//! Logging is controlled with `RUST_LOG` (default `info`).
mod args;

use crate::args::{CliArgs, Commands};
use anyhow::Context;
use clap::Parser;
use placedex_core::{
    fold_key, score, AutocompleteEngine, Harvester, HttpTransport, MemoryStore, RateLimitedClient,
    Settings,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::from_json_file(path)?,
        None => Settings::from_env()?,
    };
    if let Some(path) = args.snapshot {
        settings.snapshot_path = Some(path);
    }

    match args.command {
        Commands::Run { no_initial_delay } => {
            if no_initial_delay {
                settings.harvest.initial_delay_secs = 0;
            }
            run(settings).await?;
        }

        Commands::Harvest => {
            settings.validate()?;
            let store = Arc::new(open_store(settings.snapshot_path.as_deref())?);
            let harvester = build_harvester(&settings, store.clone())?;
            let report = harvester.harvest_cycle().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            persist(store, settings.snapshot_path.clone())
                .await
                .context("snapshot task")?;
        }

        Commands::Query { text } => {
            let store = Arc::new(open_store(settings.snapshot_path.as_deref())?);
            let engine = AutocompleteEngine::new(store, settings.query);
            let hits = engine.query(&text).await?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }

        Commands::Places => {
            let store = Arc::new(open_store(settings.snapshot_path.as_deref())?);
            let engine = AutocompleteEngine::new(store, settings.query);
            let places = engine.list_all_known_places().await?;
            println!("{}", serde_json::to_string_pretty(&places)?);
        }

        Commands::Score { name, baseline } => {
            println!("{}", score(&fold_key(&name), baseline));
        }
    }

    Ok(())
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    settings.validate()?;
    let snapshot = settings.snapshot_path.clone();
    let store = Arc::new(open_store(snapshot.as_deref())?);

    let harvester = Arc::new(build_harvester(&settings, store.clone())?);
    let scheduler = {
        let store = store.clone();
        let snapshot = snapshot.clone();
        harvester.spawn_scheduler(move |report| {
            info!(places = report.places(), "cycle complete");
            // Detached: the snapshot write runs on the blocking pool.
            drop(persist(store.clone(), snapshot.clone()));
        })
    };

    let engine = AutocompleteEngine::new(store.clone(), settings.query);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match engine.query(&line).await {
                    Ok(hits) => println!("{}", serde_json::to_string(&hits)?),
                    Err(e) => warn!(error = %e, "query failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    scheduler.abort();
    persist(store, snapshot).await.context("snapshot task")?;
    Ok(())
}

fn build_harvester(
    settings: &Settings,
    store: Arc<MemoryStore>,
) -> anyhow::Result<Harvester<HttpTransport, MemoryStore>> {
    let transport = HttpTransport::new(&settings.client).context("building HTTP client")?;
    let client = Arc::new(RateLimitedClient::new(transport, &settings.client));
    Ok(Harvester::new(client, store, settings.harvest.clone()))
}

fn open_store(snapshot: Option<&Path>) -> anyhow::Result<MemoryStore> {
    match snapshot {
        Some(path) if path.exists() => {
            let store = MemoryStore::load_snapshot(path)
                .with_context(|| format!("loading snapshot {}", path.display()))?;
            info!(path = %path.display(), keys = store.stats().keys, "snapshot restored");
            Ok(store)
        }
        Some(path) => {
            info!(path = %path.display(), "no snapshot yet, starting empty");
            Ok(MemoryStore::new())
        }
        None => Ok(MemoryStore::new()),
    }
}

/// Write the snapshot on the blocking pool.
fn persist(store: Arc<MemoryStore>, snapshot: Option<PathBuf>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || save_store(&store, snapshot.as_deref()))
}

fn save_store(store: &MemoryStore, snapshot: Option<&Path>) {
    let Some(path) = snapshot else { return };
    match store.save_snapshot(path) {
        Ok(()) => info!(path = %path.display(), "snapshot saved"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to save snapshot"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use placedex_core::KvStore;

    #[tokio::test]
    async fn persist_writes_snapshot_off_the_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("places.bin");

        let store = Arc::new(MemoryStore::new());
        store.hset("locations", "1", "Washington").await.unwrap();
        persist(store, Some(path.clone())).await.unwrap();

        let restored = open_store(Some(&path)).unwrap();
        assert_eq!(
            restored.hget("locations", "1").await.unwrap().as_deref(),
            Some("Washington")
        );
    }

    #[tokio::test]
    async fn persist_without_path_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        persist(store, None).await.unwrap();
    }
}
