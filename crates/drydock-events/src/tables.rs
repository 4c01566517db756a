//! redb table definitions for the event log.

use redb::TableDefinition;

/// Events keyed by `(unix time, sequence)`, JSON values.
pub const EVENTS: TableDefinition<(i64, u64), &[u8]> = TableDefinition::new("events");
