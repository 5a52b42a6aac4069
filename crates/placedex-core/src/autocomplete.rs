// crates/placedex-core/src/autocomplete.rs

//! # Autocomplete
//!
//! A query is tokenized exactly like place names are at index time. Each
//! word selects the prefix set `sloc:{word}`; the weighted intersection of
//! those sets (scores summed) is the ranked candidate list. That list is
//! cached under `autoc:{w1,w2,...}` for an hour, so repeated keystrokes for
//! the same words skip the intersection.
//!
//! Candidates are resolved against their live place record. Ids whose record
//! has expired are dropped silently; see [`crate::store`] on consistency.

use crate::config::QueryConfig;
use crate::error::Result;
use crate::model::{Suggestion, FIELD_CATEGORY, FIELD_NAME};
use crate::store::{keys, KvStore};
use crate::text::{tokenize, truncate_chars, MAX_PREFIX_LEN};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub struct AutocompleteEngine<S> {
    store: Arc<S>,
    config: QueryConfig,
}

impl<S: KvStore> AutocompleteEngine<S> {
    pub fn new(store: Arc<S>, config: QueryConfig) -> Self {
        AutocompleteEngine { store, config }
    }

    /// Up to `max_results` suggestions for `raw`, best first.
    pub async fn query(&self, raw: &str) -> Result<Vec<Suggestion>> {
        let words = query_words(raw);
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let ids = self.ranked_ids(&words).await?;
        let mut suggestions = Vec::with_capacity(ids.len());
        for id in ids {
            match self.resolve(&id).await? {
                Some(s) => suggestions.push(s),
                None => debug!(%id, "dropping dangling suggestion"),
            }
        }
        Ok(suggestions)
    }

    /// The first `max_results` place ids for already-normalized `words`,
    /// from the cache when it is live.
    ///
    /// The cache is read before anything else; an `autoc:` key is never
    /// stored empty, so an empty read means a miss and the intersection is
    /// rebuilt.
    pub async fn ranked_ids(&self, words: &[String]) -> Result<Vec<String>> {
        let cache_key = keys::autocomplete(words);

        let cached = self
            .store
            .zrange(&cache_key, 0, self.config.max_results)
            .await?;
        if !cached.is_empty() {
            debug!(key = %cache_key, "autocomplete cache hit");
            return Ok(cached);
        }

        let sets: Vec<String> = words.iter().map(|w| keys::prefix(w)).collect();
        let matched = self
            .store
            .zinterstore(&cache_key, &sets, Some(self.config.cache_ttl()))
            .await?;
        debug!(key = %cache_key, matched, "autocomplete cache filled");
        if matched == 0 {
            return Ok(Vec::new());
        }

        self.store
            .zrange(&cache_key, 0, self.config.max_results)
            .await
    }

    async fn resolve(&self, id: &str) -> Result<Option<Suggestion>> {
        let record = keys::place(id);
        let Some(name) = self.store.hget(&record, FIELD_NAME).await? else {
            return Ok(None);
        };
        let category = self
            .store
            .hget(&record, FIELD_CATEGORY)
            .await?
            .unwrap_or_default();
        Ok(Some(Suggestion { name, category }))
    }

    /// Every place in the category index, id → name.
    pub async fn list_all_known_places(&self) -> Result<BTreeMap<String, String>> {
        self.store.hgetall(keys::PLACE_INDEX).await
    }
}

/// Tokenized, non-empty query words, each cut to the longest indexed prefix.
pub fn query_words(raw: &str) -> Vec<String> {
    tokenize(raw)
        .into_iter()
        .filter(|w| !w.is_empty())
        .map(|w| truncate_chars(&w, MAX_PREFIX_LEN).to_owned())
        .collect()
}
