//! # Quote Search
//!
//! Semantic search over short windows of dialogue taken from episodic
//! scripts. A corpus CSV is split into overlapping, episode-bounded windows,
//! each window is embedded, and queries are answered by dot-product ranking
//! with overlap suppression.
//!
//! The algorithms live in [`quote_search_core`]; this crate adds the
//! configuration, CSV ingestion, concrete embedding providers, SQLite
//! persistence, and the `qs` command-line interface.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ CSV      │──▶│ Window       │──▶│ Embedding    │──▶│ SQLite   │
//! │ corpus   │   │ builder      │   │ attacher     │   │ datasets │
//! └──────────┘   └──────────────┘   └──────────────┘   └────┬─────┘
//!                                                           │
//!                              query ──▶ score ▶ rank ▶ dedupe
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`corpus`] | CSV corpus and `info.json` loading |
//! | [`embedding`] | Concrete embedding providers |
//! | [`build`] | Corpus → stored dataset |
//! | [`search`] | Query a stored dataset |
//! | [`datasets`] | List stored datasets |
//! | [`export`] | Dataset → JSON |
//! | [`sqlite_store`] | SQLite [`DatasetStore`](quote_search_core::store::DatasetStore) |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod build;
pub mod config;
pub mod corpus;
pub mod datasets;
pub mod db;
pub mod embedding;
pub mod export;
pub mod migrate;
pub mod search;
pub mod sqlite_store;
