//! Component registration and priority ordering (§4.1 `Register`).
//!
//! Supplemental `ComponentPriorityGroup` helper, grounded on
//! `original_source/01-CORE/production` and `01-CORE/coordination`: the
//! distilled contract only requires ascending-priority ordering, but the
//! source runs same-priority components concurrently within their group,
//! still serializing group-to-group.

use confluence_core::Component;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A registered component plus its ordering priority.
pub struct ComponentEntry {
    pub priority: i64,
    pub component: Arc<dyn Component>,
}

/// Error returned by [`ComponentRegistry::register`] when the name
/// already exists (§4.1 "fails if name exists").
#[derive(Debug, Clone, thiserror::Error)]
#[error("component '{0}' is already registered")]
pub struct DuplicateComponent(pub String);

/// Components keyed by name, grouped by priority for ordered lifecycle
/// traversal.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: BTreeMap<String, ComponentEntry>,
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        component: Arc<dyn Component>,
        priority: i64,
    ) -> Result<(), DuplicateComponent> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(DuplicateComponent(name));
        }
        self.entries.insert(name, ComponentEntry { priority, component });
        Ok(())
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&ComponentEntry> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Components grouped by shared priority, ascending. Each group is a
    /// `ComponentPriorityGroup`: initialize/start run concurrently within
    /// it (via `join_all`), but groups themselves are traversed in order.
    pub fn ascending_groups(&self) -> Vec<Vec<(String, Arc<dyn Component>)>> {
        self.grouped(false)
    }

    /// Same grouping, descending — used by `Stop` (§4.1 "reverse priority").
    pub fn descending_groups(&self) -> Vec<Vec<(String, Arc<dyn Component>)>> {
        self.grouped(true)
    }

    fn grouped(&self, descending: bool) -> Vec<Vec<(String, Arc<dyn Component>)>> {
        let mut by_priority: BTreeMap<i64, Vec<(String, Arc<dyn Component>)>> = BTreeMap::new();
        for (name, entry) in &self.entries {
            by_priority
                .entry(entry.priority)
                .or_default()
                .push((name.clone(), entry.component.clone()));
        }
        let groups: Vec<_> = by_priority.into_values().collect();
        if descending {
            groups.into_iter().rev().collect()
        } else {
            groups
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use confluence_core::{ComponentHealth, ConfluenceError};
    use chrono::Utc;

    struct Noop(&'static str);

    #[async_trait]
    impl Component for Noop {
        fn name(&self) -> &str {
            self.0
        }
        async fn initialize(&self) -> Result<bool, ConfluenceError> {
            Ok(true)
        }
        async fn start(&self) -> Result<bool, ConfluenceError> {
            Ok(true)
        }
        async fn stop(&self, _emergency: bool) -> Result<bool, ConfluenceError> {
            Ok(true)
        }
        async fn health_check(&self) -> ComponentHealth {
            ComponentHealth::new(self.0, Utc::now())
        }
    }

    #[test]
    fn register_rejects_duplicate_names() {
        let mut registry = ComponentRegistry::new();
        registry.register("a", Arc::new(Noop("a")), 10).unwrap();
        assert!(registry.register("a", Arc::new(Noop("a")), 20).is_err());
    }

    #[test]
    fn groups_are_ordered_ascending_then_descending() {
        let mut registry = ComponentRegistry::new();
        registry.register("a", Arc::new(Noop("a")), 10).unwrap();
        registry.register("b", Arc::new(Noop("b")), 20).unwrap();
        registry.register("c", Arc::new(Noop("c")), 20).unwrap();

        let ascending = registry.ascending_groups();
        assert_eq!(ascending.len(), 2);
        assert_eq!(ascending[0][0].0, "a");
        assert_eq!(ascending[1].len(), 2);

        let descending = registry.descending_groups();
        assert_eq!(descending[0].len(), 2);
        assert_eq!(descending[1][0].0, "a");
    }
}
