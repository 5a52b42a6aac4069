// crates/placedex-core/src/store/mod.rs

//! # Store Capability
//!
//! The harvester and the autocomplete engine only need five things from a
//! key-value store: hash maps with field access, key expiry, existence
//! checks, score-ordered sets with rank ranges, and weighted intersection of
//! those sets into an expiring destination. [`KvStore`] names exactly that
//! surface; [`MemoryStore`] is the in-process implementation.
//!
//! ## Consistency
//!
//! Prefix sets are never cleaned when a place expires. Readers must treat a
//! set member without a live place record as "no result", never as an
//! error. The staleness is bounded by the harvest period and the
//! autocomplete cache TTL.

use crate::error::Result;
use crate::score::Score;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

mod memory;

pub use memory::MemoryStore;

/// Key naming shared by every reader and writer of the store.
pub mod keys {
    /// Category index: place id → display name.
    pub const PLACE_INDEX: &str = "locations";

    /// Hash holding one place record.
    pub fn place(id: &str) -> String {
        format!("loc:{id}")
    }

    /// Score-ordered set of place ids whose name has a word starting with `prefix`.
    pub fn prefix(prefix: &str) -> String {
        format!("sloc:{prefix}")
    }

    /// Cached ranking for a normalized query word list.
    pub fn autocomplete(words: &[String]) -> String {
        format!("autoc:{}", words.join(","))
    }
}

#[async_trait]
pub trait KvStore: Send + Sync {
    // ── Hashes ──

    /// Set several fields of a hash, creating it if needed.
    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> Result<()>;
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;
    async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>>;
    async fn hkeys(&self, key: &str) -> Result<Vec<String>>;
    /// Returns whether the field existed.
    async fn hdel(&self, key: &str, field: &str) -> Result<bool>;

    // ── Keys ──

    /// Set a time-to-live on an existing key. Returns `false` if there is no such key.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;
    async fn exists(&self, key: &str) -> Result<bool>;
    async fn del(&self, key: &str) -> Result<bool>;

    // ── Sorted sets ──

    /// Add or re-score `member`. Returns `true` if the member is new.
    async fn zadd(&self, key: &str, member: &str, score: Score) -> Result<bool>;
    async fn zscore(&self, key: &str, member: &str) -> Result<Option<Score>>;
    /// Members by ascending score (ties by member), ranks `start..start + count`.
    async fn zrange(&self, key: &str, start: usize, count: usize) -> Result<Vec<String>>;
    async fn zcard(&self, key: &str) -> Result<usize>;
    /// Store in `dest` the members present in every `keys` set, scored by
    /// the sum of their scores, and expire `dest` after `ttl`. An empty
    /// result leaves `dest` absent. Returns the size of the result.
    async fn zinterstore(&self, dest: &str, keys: &[String], ttl: Option<Duration>) -> Result<usize>;
}

#[async_trait]
impl<S: KvStore + ?Sized> KvStore for std::sync::Arc<S> {
    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        (**self).hset_multiple(key, fields).await
    }
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        (**self).hset(key, field, value).await
    }
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        (**self).hget(key, field).await
    }
    async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>> {
        (**self).hgetall(key).await
    }
    async fn hkeys(&self, key: &str) -> Result<Vec<String>> {
        (**self).hkeys(key).await
    }
    async fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        (**self).hdel(key, field).await
    }
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        (**self).expire(key, ttl).await
    }
    async fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key).await
    }
    async fn del(&self, key: &str) -> Result<bool> {
        (**self).del(key).await
    }
    async fn zadd(&self, key: &str, member: &str, score: Score) -> Result<bool> {
        (**self).zadd(key, member, score).await
    }
    async fn zscore(&self, key: &str, member: &str) -> Result<Option<Score>> {
        (**self).zscore(key, member).await
    }
    async fn zrange(&self, key: &str, start: usize, count: usize) -> Result<Vec<String>> {
        (**self).zrange(key, start, count).await
    }
    async fn zcard(&self, key: &str) -> Result<usize> {
        (**self).zcard(key).await
    }
    async fn zinterstore(&self, dest: &str, keys: &[String], ttl: Option<Duration>) -> Result<usize> {
        (**self).zinterstore(dest, keys, ttl).await
    }
}
