//! Process-lifetime summary cache, one entry per tab.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

use crate::core::{Summary, TabId};

/// No expiry and no size bound; `clear` is the only invalidation path.
#[derive(Default)]
pub struct SummaryCache {
    entries: RwLock<HashMap<TabId, Summary>>,
}

impl SummaryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, tab_id: TabId) -> Option<Summary> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&tab_id)
            .cloned()
    }

    /// Overwrites any existing entry for the tab.
    pub fn put(&self, tab_id: TabId, summary: Summary) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tab_id, summary);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        debug!("Clearing {} cached summaries", entries.len());
        entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
