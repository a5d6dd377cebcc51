//! Display identities of the table widgets of one dashboard.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Prefix of generated table identities.
pub const TABLE_ID_PREFIX: &str = "element_table";

const FIRST_INDEX: usize = 1;

/// Issues `element_table<N>` identities, numbering from 1.
///
/// One allocator is shared by the table widgets of a single dashboard, so
/// numbering never leaks between dashboards.
#[derive(Debug)]
pub struct TableIdAllocator {
    next_index: AtomicUsize,
}

impl Default for TableIdAllocator {
    fn default() -> Self {
        Self {
            next_index: AtomicUsize::new(FIRST_INDEX),
        }
    }
}

impl TableIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep an identity already present in the live view, otherwise issue the next one.
    pub fn allocate(&self, existing: Option<&str>) -> String {
        if let Some(existing) = existing.map(str::trim).filter(|id| !id.is_empty()) {
            return existing.to_string();
        }
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        format!("{TABLE_ID_PREFIX}{index}")
    }

    /// Restart numbering; called when a table widget of the dashboard is torn down.
    pub fn reset(&self) {
        self.next_index.store(FIRST_INDEX, Ordering::Relaxed);
    }
}
