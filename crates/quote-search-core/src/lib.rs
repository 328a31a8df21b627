//! # Quote Search Core
//!
//! Shared, I/O-free logic for Quote Search: data models, context-window
//! construction, the embedding provider trait and batched attacher, and the
//! score / rank / dedupe query pipeline.
//!
//! This crate contains no SQLite, HTTP, or filesystem code. Concrete
//! embedding providers and persistent stores live in the `quote-search`
//! application crate.

pub mod embedding;
pub mod error;
pub mod models;
pub mod search;
pub mod store;
pub mod window;

pub use error::SearchError;
