// crates/placedex-core/src/store/memory.rs
use super::KvStore;
use crate::error::{PlaceError, Result};
use crate::score::Score;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[cfg(feature = "compact")]
use flate2::{read::GzDecoder, write::GzEncoder, Compression};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default)]
struct SortedSet {
    scores: HashMap<String, Score>,
    order: BTreeSet<(Score, String)>,
}

impl SortedSet {
    fn insert(&mut self, member: &str, score: Score) -> bool {
        match self.scores.insert(member.to_owned(), score) {
            Some(old) if old == score => false,
            Some(old) => {
                self.order.remove(&(old, member.to_owned()));
                self.order.insert((score, member.to_owned()));
                false
            }
            None => {
                self.order.insert((score, member.to_owned()));
                true
            }
        }
    }

    fn len(&self) -> usize {
        self.scores.len()
    }
}

#[derive(Debug, Clone)]
enum Value {
    Hash(BTreeMap<String, String>),
    Sorted(SortedSet),
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }
}

/// Counts for diagnostics, after dropping expired keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub keys: usize,
    pub hashes: usize,
    pub sorted_sets: usize,
    pub expiring: usize,
}

#[derive(Serialize, Deserialize)]
enum SnapshotValue {
    Hash(Vec<(String, String)>),
    Sorted(Vec<(String, Score)>),
}

#[derive(Serialize, Deserialize)]
struct SnapshotEntry {
    key: String,
    value: SnapshotValue,
    ttl_ms: Option<u64>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    entries: Vec<SnapshotEntry>,
}

/// In-process [`KvStore`] on top of `DashMap`.
///
/// Expiry is lazy: an expired key is dropped the next time anything touches
/// it, or by [`MemoryStore::purge_expired`]. Time comes from `tokio::time`,
/// so tests can pause and advance the clock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: DashMap<String, Slot>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every further operation fail, as if the store went away.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PlaceError::Store("store is closed".into()));
        }
        Ok(())
    }

    fn evict_if_expired(&self, key: &str) {
        let now = Instant::now();
        self.data.remove_if(key, |_, slot| slot.is_expired(now));
    }

    /// Drop every expired key now. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.data.len();
        self.data.retain(|_, slot| !slot.is_expired(now));
        before.saturating_sub(self.data.len())
    }

    pub fn stats(&self) -> StoreStats {
        self.purge_expired();
        let mut stats = StoreStats::default();
        for slot in self.data.iter() {
            stats.keys += 1;
            match slot.value {
                Value::Hash(_) => stats.hashes += 1,
                Value::Sorted(_) => stats.sorted_sets += 1,
            }
            if slot.expires_at.is_some() {
                stats.expiring += 1;
            }
        }
        stats
    }

    fn sorted_copy(&self, key: &str) -> Result<Option<HashMap<String, Score>>> {
        self.evict_if_expired(key);
        match self.data.get(key) {
            None => Ok(None),
            Some(slot) => match &slot.value {
                Value::Sorted(set) => Ok(Some(set.scores.clone())),
                Value::Hash(_) => Err(wrong_type(key)),
            },
        }
    }

    /// Write every live key, with its remaining TTL, to `path`.
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let now = Instant::now();
        let entries: Vec<SnapshotEntry> = self
            .data
            .iter()
            .filter(|slot| !slot.is_expired(now))
            .map(|slot| SnapshotEntry {
                key: slot.key().clone(),
                value: match &slot.value {
                    Value::Hash(h) => SnapshotValue::Hash(h.clone().into_iter().collect()),
                    Value::Sorted(s) => SnapshotValue::Sorted(
                        s.order.iter().map(|(score, m)| (m.clone(), *score)).collect(),
                    ),
                },
                ttl_ms: slot
                    .expires_at
                    .map(|t| t.saturating_duration_since(now).as_millis() as u64),
            })
            .collect();
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            entries,
        };

        let file = File::create(path.as_ref())?;
        let writer = BufWriter::new(file);

        #[cfg(feature = "compact")]
        let mut writer = {
            let mut encoder = GzEncoder::new(writer, Compression::default());
            bincode::serialize_into(&mut encoder, &snapshot)?;
            encoder.finish()?
        };
        #[cfg(not(feature = "compact"))]
        let mut writer = {
            let mut writer = writer;
            bincode::serialize_into(&mut writer, &snapshot)?;
            writer
        };

        writer.flush()?;
        debug!(path = %path.as_ref().display(), keys = snapshot.entries.len(), "snapshot written");
        Ok(())
    }

    /// Rebuild a store from a file written by [`save_snapshot`](Self::save_snapshot).
    pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PlaceError::NotFound(format!("Snapshot not found at {}: {}", path.display(), e))
        })?;
        let reader = BufReader::new(file);

        #[cfg(feature = "compact")]
        let decoder: Box<dyn Read> = Box::new(GzDecoder::new(reader));
        #[cfg(not(feature = "compact"))]
        let decoder: Box<dyn Read> = Box::new(reader);

        let snapshot: Snapshot = bincode::deserialize_from(decoder)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PlaceError::InvalidData(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        let now = Instant::now();
        let store = MemoryStore::new();
        for entry in snapshot.entries {
            let value = match entry.value {
                SnapshotValue::Hash(fields) => Value::Hash(fields.into_iter().collect()),
                SnapshotValue::Sorted(members) => {
                    let mut set = SortedSet::default();
                    for (member, score) in members {
                        set.insert(&member, score);
                    }
                    Value::Sorted(set)
                }
            };
            let expires_at = entry.ttl_ms.map(|ms| now + Duration::from_millis(ms));
            store.data.insert(entry.key, Slot { value, expires_at });
        }
        debug!(path = %path.display(), keys = store.data.len(), "snapshot loaded");
        Ok(store)
    }
}

fn wrong_type(key: &str) -> PlaceError {
    PlaceError::Store(format!("WRONGTYPE operation against key {key}"))
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        self.check_open()?;
        self.evict_if_expired(key);
        let mut slot = self.data.entry(key.to_owned()).or_insert_with(|| Slot {
            value: Value::Hash(BTreeMap::new()),
            expires_at: None,
        });
        match &mut slot.value {
            Value::Hash(h) => {
                for (f, v) in fields {
                    h.insert(f.clone(), v.clone());
                }
                Ok(())
            }
            Value::Sorted(_) => Err(wrong_type(key)),
        }
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.hset_multiple(key, &[(field.to_owned(), value.to_owned())])
            .await
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.check_open()?;
        self.evict_if_expired(key);
        match self.data.get(key) {
            None => Ok(None),
            Some(slot) => match &slot.value {
                Value::Hash(h) => Ok(h.get(field).cloned()),
                Value::Sorted(_) => Err(wrong_type(key)),
            },
        }
    }

    async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>> {
        self.check_open()?;
        self.evict_if_expired(key);
        match self.data.get(key) {
            None => Ok(BTreeMap::new()),
            Some(slot) => match &slot.value {
                Value::Hash(h) => Ok(h.clone()),
                Value::Sorted(_) => Err(wrong_type(key)),
            },
        }
    }

    async fn hkeys(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.hgetall(key).await?.into_keys().collect())
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        self.check_open()?;
        self.evict_if_expired(key);
        let removed = match self.data.get_mut(key) {
            None => return Ok(false),
            Some(mut slot) => match &mut slot.value {
                Value::Hash(h) => h.remove(field).is_some(),
                Value::Sorted(_) => return Err(wrong_type(key)),
            },
        };
        self.data
            .remove_if(key, |_, slot| matches!(&slot.value, Value::Hash(h) if h.is_empty()));
        Ok(removed)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.check_open()?;
        self.evict_if_expired(key);
        match self.data.get_mut(key) {
            None => Ok(false),
            Some(mut slot) => {
                slot.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.check_open()?;
        self.evict_if_expired(key);
        Ok(self.data.contains_key(key))
    }

    async fn del(&self, key: &str) -> Result<bool> {
        self.check_open()?;
        self.evict_if_expired(key);
        Ok(self.data.remove(key).is_some())
    }

    async fn zadd(&self, key: &str, member: &str, score: Score) -> Result<bool> {
        self.check_open()?;
        self.evict_if_expired(key);
        let mut slot = self.data.entry(key.to_owned()).or_insert_with(|| Slot {
            value: Value::Sorted(SortedSet::default()),
            expires_at: None,
        });
        match &mut slot.value {
            Value::Sorted(set) => Ok(set.insert(member, score)),
            Value::Hash(_) => Err(wrong_type(key)),
        }
    }

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<Score>> {
        self.check_open()?;
        self.evict_if_expired(key);
        match self.data.get(key) {
            None => Ok(None),
            Some(slot) => match &slot.value {
                Value::Sorted(set) => Ok(set.scores.get(member).copied()),
                Value::Hash(_) => Err(wrong_type(key)),
            },
        }
    }

    async fn zrange(&self, key: &str, start: usize, count: usize) -> Result<Vec<String>> {
        self.check_open()?;
        self.evict_if_expired(key);
        match self.data.get(key) {
            None => Ok(Vec::new()),
            Some(slot) => match &slot.value {
                Value::Sorted(set) => Ok(set
                    .order
                    .iter()
                    .skip(start)
                    .take(count)
                    .map(|(_, m)| m.clone())
                    .collect()),
                Value::Hash(_) => Err(wrong_type(key)),
            },
        }
    }

    async fn zcard(&self, key: &str) -> Result<usize> {
        self.check_open()?;
        self.evict_if_expired(key);
        match self.data.get(key) {
            None => Ok(0),
            Some(slot) => match &slot.value {
                Value::Sorted(set) => Ok(set.len()),
                Value::Hash(_) => Err(wrong_type(key)),
            },
        }
    }

    async fn zinterstore(&self, dest: &str, keys: &[String], ttl: Option<Duration>) -> Result<usize> {
        self.check_open()?;

        // Copy the sources first; no map guard is held while writing `dest`.
        let mut sources = Vec::with_capacity(keys.len());
        for key in keys {
            match self.sorted_copy(key)? {
                Some(set) => sources.push(set),
                None => {
                    sources.clear();
                    break;
                }
            }
        }

        let mut result = SortedSet::default();
        if let Some((smallest_idx, smallest)) = sources.iter().enumerate().min_by_key(|(_, s)| s.len()) {
            for (member, &score) in smallest {
                let mut total = score;
                let mut in_all = true;
                for (i, other) in sources.iter().enumerate() {
                    if i == smallest_idx {
                        continue;
                    }
                    match other.get(member) {
                        Some(&s) => total = total + s,
                        None => {
                            in_all = false;
                            break;
                        }
                    }
                }
                if in_all {
                    result.insert(member, total);
                }
            }
        }

        let size = result.len();
        match self.data.entry(dest.to_owned()) {
            Entry::Occupied(e) if size == 0 => {
                e.remove();
            }
            Entry::Vacant(_) if size == 0 => {}
            entry => {
                entry.insert(Slot {
                    value: Value::Sorted(result),
                    expires_at: ttl.map(|t| Instant::now() + t),
                });
            }
        }
        Ok(size)
    }
}
