//! EventStore: redb-backed event log.
//!
//! Values are JSON-serialized [`Event`]s. Keys are `(time, seq)` where
//! `seq` is a store-wide counter, so iteration is chronological and
//! events sharing a timestamp keep their insertion order.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{EventError, EventResult};
use crate::sink::EventSink;
use crate::tables::EVENTS;
use crate::types::Event;

macro_rules! map_err {
    ($variant:ident) => {
        |e| EventError::$variant(e.to_string())
    };
}

/// Thread-safe event log. Clones share the same database.
#[derive(Clone)]
pub struct EventStore {
    db: Arc<Database>,
    seq: Arc<AtomicU64>,
}

impl EventStore {
    /// Open (or create) a persistent event log at the given path.
    pub fn open(path: &Path) -> EventResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self::init(db)?;
        debug!(?path, "event store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory event log.
    pub fn open_in_memory() -> EventResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        Self::init(db)
    }

    fn init(db: Database) -> EventResult<Self> {
        let txn = db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(EVENTS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;

        // Resume the sequence after the highest one on disk.
        let next = {
            let txn = db.begin_read().map_err(map_err!(Transaction))?;
            let table = txn.open_table(EVENTS).map_err(map_err!(Table))?;
            let mut max = None;
            for entry in table.iter().map_err(map_err!(Read))? {
                let (key, _) = entry.map_err(map_err!(Read))?;
                let (_, seq) = key.value();
                max = max.max(Some(seq));
            }
            max.map_or(0, |seq| seq + 1)
        };

        Ok(Self {
            db: Arc::new(db),
            seq: Arc::new(AtomicU64::new(next)),
        })
    }

    /// Append an event.
    pub fn record(&self, event: &Event) -> EventResult<()> {
        let value = serde_json::to_vec(event).map_err(map_err!(Serialize))?;
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(EVENTS).map_err(map_err!(Table))?;
            table
                .insert((event.time, seq), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(kind = %event.kind, time = event.time, seq, "event recorded");
        Ok(())
    }

    /// Events newest-first, at most `limit` of them (`None` for all).
    pub fn list(&self, limit: Option<usize>) -> EventResult<Vec<Event>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(EVENTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table
            .iter()
            .map_err(map_err!(Read))?
            .rev()
            .take(limit.unwrap_or(usize::MAX))
        {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let event: Event =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(event);
        }
        Ok(results)
    }

    /// Delete every event. Returns the number removed.
    pub fn purge(&self) -> EventResult<u64> {
        let keys: Vec<(i64, u64)> = {
            let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
            let table = txn.open_table(EVENTS).map_err(map_err!(Table))?;
            let mut keys = Vec::new();
            for entry in table.iter().map_err(map_err!(Read))? {
                let (key, _) = entry.map_err(map_err!(Read))?;
                keys.push(key.value());
            }
            keys
        };
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(EVENTS).map_err(map_err!(Table))?;
            for key in &keys {
                table.remove(*key).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(count = keys.len(), "events purged");
        Ok(keys.len() as u64)
    }
}

impl EventSink for EventStore {
    fn record(&self, event: &Event) -> EventResult<()> {
        EventStore::record(self, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_is_newest_first() {
        let store = EventStore::open_in_memory().unwrap();
        store.record(&Event::new("deploy", "first").at(100)).unwrap();
        store.record(&Event::new("deploy", "second").at(200)).unwrap();
        store.record(&Event::new("deploy", "third").at(150)).unwrap();

        let messages: Vec<_> = store
            .list(None)
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["second", "third", "first"]);
    }

    #[test]
    fn same_timestamp_does_not_overwrite() {
        let store = EventStore::open_in_memory().unwrap();
        for i in 0..3 {
            store.record(&Event::new("start", format!("e{i}")).at(7)).unwrap();
        }
        let events = store.list(None).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].message, "e2");
        assert_eq!(events[2].message, "e0");
    }

    #[test]
    fn limit_truncates() {
        let store = EventStore::open_in_memory().unwrap();
        for t in 0..5 {
            store.record(&Event::new("scale", "").at(t)).unwrap();
        }
        let events = store.list(Some(2)).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].time, 4);
        assert_eq!(store.list(Some(0)).unwrap().len(), 0);
    }

    #[test]
    fn purge_removes_everything() {
        let store = EventStore::open_in_memory().unwrap();
        store.record(&Event::new("deploy", "a")).unwrap();
        store.record(&Event::new("deploy", "b")).unwrap();

        assert_eq!(store.purge().unwrap(), 2);
        assert!(store.list(None).unwrap().is_empty());
        assert_eq!(store.purge().unwrap(), 0);
    }

    #[test]
    fn reopen_preserves_events_and_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.redb");
        {
            let store = EventStore::open(&path).unwrap();
            store.record(&Event::new("deploy", "before").at(10)).unwrap();
        }
        let store = EventStore::open(&path).unwrap();
        store.record(&Event::new("deploy", "after").at(10)).unwrap();

        let events = store.list(None).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "after");
    }

    #[test]
    fn usable_as_sink() {
        let store = EventStore::open_in_memory().unwrap();
        let sink: &dyn EventSink = &store;
        sink.record(&Event::deployed(&["web:1".to_string()])).unwrap();
        assert_eq!(store.list(None).unwrap()[0].message, "web:1 deployed");
    }
}
