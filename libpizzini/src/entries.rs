//! Entry catalog
//!
//! Holds the parsed pizzini corpus in source order. The corpus arrives as a
//! JSON array of `{id, date, title, content}` records exported from the
//! XML source.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{EntryError, Result};
use crate::types::{ContentEntry, EntryId};

/// Ordered, id-indexed collection of entries
#[derive(Debug, Clone, Default)]
pub struct EntryCatalog {
    entries: Vec<ContentEntry>,
    index: HashMap<EntryId, usize>,
}

impl EntryCatalog {
    /// Build a catalog from already-parsed entries
    ///
    /// Blank entries (no title and no content) are skipped.
    ///
    /// # Errors
    ///
    /// Returns `EntryError::DuplicateId` if two entries share an id.
    pub fn from_entries(entries: Vec<ContentEntry>) -> Result<Self> {
        let mut catalog = Self::default();
        for entry in entries {
            if entry.is_blank() {
                debug!(entry_id = entry.id, "Skipping blank entry");
                continue;
            }
            if catalog.index.contains_key(&entry.id) {
                return Err(EntryError::DuplicateId(entry.id).into());
            }
            if !entry.date.trim().is_empty() && entry.parsed_date().is_none() {
                warn!(entry_id = entry.id, date = %entry.date, "Entry date is not dd.mm.yyyy");
            }
            catalog.index.insert(entry.id, catalog.entries.len());
            catalog.entries.push(entry);
        }
        Ok(catalog)
    }

    /// Load a catalog from a JSON file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(EntryError::Io)?;
        let entries: Vec<ContentEntry> = serde_json::from_str(&raw).map_err(EntryError::Json)?;
        let catalog = Self::from_entries(entries)?;
        info!("Loaded {} content entries from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn get(&self, id: EntryId) -> Option<&ContentEntry> {
        self.index.get(&id).map(|&i| &self.entries[i])
    }

    /// Entry ids in source order
    pub fn ids(&self) -> Vec<EntryId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
