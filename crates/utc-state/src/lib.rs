//! utc-state — feature store for the Unified Trust Console.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for per-unit queueing features (smoothed arrival/service rates and
//! the current protection level).
//!
//! # Architecture
//!
//! Each [`Feature`] is JSON-serialized into redb's `&[u8]` value column,
//! keyed by its unit identifier. Every store call runs in its own
//! transaction; read transactions are snapshots, so a reader never sees a
//! half-written feature.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across threads and async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::{FeatureStore, StateStore};
pub use types::*;
