// crates/placedex-core/src/lib.rs

pub mod autocomplete; // Query side
pub mod category;
pub mod client; // Outbound catalog access
pub mod config;
pub mod error;
pub mod harvest; // Write side
pub mod model;
pub mod prune;
pub mod ratelimit;
pub mod score;
pub mod store; // Store capability + in-memory backend
pub mod text;
// Upstream JSON shapes, only used while harvesting
#[doc(hidden)]
pub mod raw;

// Re-exports
pub use crate::autocomplete::AutocompleteEngine;
pub use crate::category::Category;
#[cfg(feature = "http")]
pub use crate::client::HttpTransport;
pub use crate::client::{CatalogRequest, RateLimitedClient, Transport};
pub use crate::config::{ClientConfig, HarvestConfig, QueryConfig, RetryPolicy, Settings};
pub use crate::error::{PlaceError, Result};
pub use crate::harvest::Harvester;
pub use crate::model::{CycleReport, HarvestReport, Place, PruneReport, Suggestion};
pub use crate::prune::Pruner;
pub use crate::score::{score, Score};
pub use crate::store::{KvStore, MemoryStore};
pub use crate::text::{fold_key, tokenize};
