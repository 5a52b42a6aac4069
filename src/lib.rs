//! placedex
//! ========
//!
//! Convenience crate re-exporting [`placedex_core`], so demos and downstream
//! tooling can depend on a single name.

pub use placedex_core::*;

pub mod prelude {
    pub use placedex_core::client::{Credential, RawResponse};
    pub use placedex_core::{
        AutocompleteEngine, CatalogRequest, Category, HarvestConfig, Harvester, KvStore,
        MemoryStore, PlaceError, QueryConfig, RateLimitedClient, Result, Settings, Suggestion,
        Transport,
    };
}
