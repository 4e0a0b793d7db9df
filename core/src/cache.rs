//! Session-scoped cache of workspace columns.
//!
//! Filled when workspaces are loaded and read when columns are loaded.
//! Entries are overwritten on every workspace load and never evicted, so a
//! column set changed remotely after the last workspace load is served stale.

use std::collections::HashMap;

/// A workspace column as the API reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedColumn {
    pub id: String,
    pub title: String,
}

/// Maps a workspace reference (`/workspaces/{id}`) to its ordered columns.
#[derive(Debug, Clone, Default)]
pub struct ColumnCache {
    entries: HashMap<String, Vec<CachedColumn>>,
}

impl ColumnCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, workspace: impl Into<String>, columns: Vec<CachedColumn>) {
        self.entries.insert(workspace.into(), columns);
    }

    pub fn get(&self, workspace: &str) -> Option<&[CachedColumn]> {
        self.entries.get(workspace).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
