//! placedex-cli
//! ============
//!
//! Command-line runner for the `placedex-core` harvester and autocomplete
//! engine.
//!
//! This crate primarily provides a binary (`placedex`). We include a small
//! library target so that docs.rs renders a documentation page and shows this
//! overview.
//!
//! Quick start
//! -----------
//!
//! ```text
//! export PLACEDEX_TOKEN=...
//! placedex --snapshot places.bin harvest
//! placedex --snapshot places.bin query "wash co"
//! placedex --snapshot places.bin run --no-initial-delay
//! ```
//!
//! Settings come from `--config <json>` (or defaults), overlaid with the
//! `PLACEDEX_*` environment variables; a `.env` file is honoured.
//!
//! For programmatic access use the [`placedex-core`] crate directly.
//!
//! [`placedex-core`]: https://docs.rs/placedex-core
#![cfg_attr(docsrs, feature(doc_cfg))]

// This library target intentionally exposes no API; the `placedex` binary is
// the deliverable. The file exists so docs.rs renders the overview above.
