//! Atomically swappable mapping table
//!
//! Dispatch takes a snapshot (`Arc<MappingTable>`) and runs against it to
//! completion. A preset reload publishes a whole new table with one pointer
//! swap, so no reader ever sees a mix of old and new entries.

use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::info;

use super::{MappingEntry, MappingTable};

pub struct MappingStore {
    current: ArcSwap<MappingTable>,
}

impl MappingStore {
    /// Store holding an empty table
    pub fn new() -> Self {
        Self::with_table(MappingTable::default())
    }

    pub fn with_table(table: MappingTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(table),
        }
    }

    /// Replace the table with one built from `entries`. Returns the previous table.
    pub fn load(&self, entries: impl IntoIterator<Item = MappingEntry>) -> Arc<MappingTable> {
        self.replace(MappingTable::new(entries))
    }

    /// Publish `table`. Dispatches already holding a snapshot finish on the old one.
    pub fn replace(&self, table: MappingTable) -> Arc<MappingTable> {
        let entries = table.len();
        let keys = table.key_count();
        let previous = self.current.swap(Arc::new(table));
        info!(
            "Mapping table replaced: {} entries on {} keys (was {} entries)",
            entries,
            keys,
            previous.len()
        );
        previous
    }

    /// Current table
    pub fn snapshot(&self) -> Arc<MappingTable> {
        self.current.load_full()
    }
}

impl Default for MappingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MappingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingStore")
            .field("entries", &self.current.load().len())
            .finish()
    }
}
