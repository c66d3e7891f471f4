//! redb table definitions for the feature store.
//!
//! Keys are unit identifiers (`&str`), values are JSON-serialized features.

use redb::TableDefinition;

/// Queueing features keyed by unit identifier.
pub const FEATURES: TableDefinition<&str, &[u8]> = TableDefinition::new("features");
