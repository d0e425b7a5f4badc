//! Registry of work items already known to the pipeline.

use seedline_core::{WorkItem, WorkItemId};
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Process-wide set of seen work item identities.
///
/// Implementations must be safe to share between producers and consumers.
pub trait DedupRegistry: Send + Sync {
    /// Record `item` as known. Registering a known item is not an error.
    fn register(&self, item: &WorkItem);
}

/// In-memory [`DedupRegistry`] keyed by [`WorkItemId`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryDedupRegistry {
    seen: Arc<RwLock<HashSet<WorkItemId>>>,
}

impl InMemoryDedupRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an item with the same identity has been registered.
    #[must_use]
    pub fn contains(&self, item: &WorkItem) -> bool {
        self.seen
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&item.id())
    }

    /// Number of distinct identities registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered identities, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<WorkItemId> {
        let mut ids: Vec<_> = self
            .seen
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl DedupRegistry for InMemoryDedupRegistry {
    fn register(&self, item: &WorkItem) {
        let id = item.id();
        let inserted = self
            .seen
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);

        if inserted {
            debug!(item = %item, "registered work item");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedline_core::HttpMethod;
    use url::Url;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid test URL")
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = InMemoryDedupRegistry::new();
        let item = WorkItem::get(url("http://a.example/"));

        registry.register(&item);
        registry.register(&item);
        registry.register(&WorkItem::get(url("http://a.example/#fragment")));

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&item));
        assert_eq!(registry.ids(), vec![item.id()]);
    }

    #[test]
    fn test_distinct_methods_are_distinct_items() {
        let registry = InMemoryDedupRegistry::new();
        registry.register(&WorkItem::get(url("http://a.example/form")));
        registry.register(&WorkItem::new(HttpMethod::Post, url("http://a.example/form")));

        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let registry = InMemoryDedupRegistry::new();
        let shared = registry.clone();
        assert!(shared.is_empty());

        registry.register(&WorkItem::get(url("http://a.example/")));
        assert_eq!(shared.len(), 1);
    }
}
