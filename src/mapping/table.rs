//! Ordered multi-map from wire key to mapping entries

use std::collections::HashMap;

use super::{MappingEntry, WireKey};

/// Immutable lookup table built from a preset.
///
/// Entries keep their load order. Several entries may share one key (for
/// example the note-on and note-off halves of a gesture both bound to the
/// same control, or one button driving two controls).
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
    /// Positions into `entries`, ascending
    index: HashMap<WireKey, Vec<usize>>,
}

impl MappingTable {
    pub fn new(entries: impl IntoIterator<Item = MappingEntry>) -> Self {
        let entries: Vec<MappingEntry> = entries.into_iter().collect();
        let mut index: HashMap<WireKey, Vec<usize>> = HashMap::new();
        for (pos, entry) in entries.iter().enumerate() {
            index.entry(entry.key).or_default().push(pos);
        }
        Self { entries, index }
    }

    /// All entries bound to `key`, in load order. Empty when unmapped.
    pub fn lookup(&self, key: &WireKey) -> impl Iterator<Item = &MappingEntry> + '_ {
        self.index
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(move |&pos| &self.entries[pos])
    }

    pub fn contains_key(&self, key: &WireKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct wire keys
    pub fn key_count(&self) -> usize {
        self.index.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingEntry> + '_ {
        self.entries.iter()
    }
}

impl FromIterator<MappingEntry> for MappingTable {
    fn from_iter<I: IntoIterator<Item = MappingEntry>>(iter: I) -> Self {
        Self::new(iter)
    }
}
