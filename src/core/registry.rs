//! Module registry - Catalog of discovered modules, one ordered list per category

use tracing::{debug, info};

use super::error::RegistryError;
use super::module::{ModuleCategory, ModuleDescriptor, ModuleHandle};

/// Catalog of discovered modules.
///
/// Populated once during startup, then shared read-only. Presentation order is
/// registration order and stays stable for the lifetime of the process.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    trackers: Vec<ModuleHandle>,
    protocols: Vec<ModuleHandle>,
    filters: Vec<ModuleHandle>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a discovered module under `category`
    pub fn register(
        &mut self,
        category: ModuleCategory,
        descriptor: ModuleDescriptor,
    ) -> Result<ModuleHandle, RegistryError> {
        if descriptor.category() != category {
            return Err(RegistryError::CategoryMismatch {
                module_id: descriptor.id().to_string(),
                expected: category,
                actual: descriptor.category(),
            });
        }

        let list = self.list_mut(category);
        if list.iter().any(|m| m.id() == descriptor.id()) {
            return Err(RegistryError::Duplicate {
                module_id: descriptor.id().to_string(),
                category,
            });
        }

        debug!("Registered {} module '{}'", category, descriptor.id());
        let handle = ModuleHandle::new(descriptor);
        list.push(ModuleHandle::clone(&handle));
        Ok(handle)
    }

    /// All modules of a category in presentation order. May be empty.
    pub fn list(&self, category: ModuleCategory) -> &[ModuleHandle] {
        match category {
            ModuleCategory::Tracker => &self.trackers,
            ModuleCategory::Protocol => &self.protocols,
            ModuleCategory::Filter => &self.filters,
        }
    }

    /// Resolve a selection index. Out of range and "no selection" both yield `None`.
    pub fn resolve(&self, category: ModuleCategory, index: Option<usize>) -> Option<ModuleHandle> {
        index
            .and_then(|i| self.list(category).get(i))
            .map(ModuleHandle::clone)
    }

    /// Position of the module with `id` within its category
    pub fn index_of(&self, category: ModuleCategory, id: &str) -> Option<usize> {
        self.list(category).iter().position(|m| m.id() == id)
    }

    /// Total number of registered modules
    pub fn len(&self) -> usize {
        self.trackers.len() + self.protocols.len() + self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Log a summary of what discovery found
    pub fn log_summary(&self) {
        info!(
            "Module registry: {} trackers, {} protocols, {} filters",
            self.trackers.len(),
            self.protocols.len(),
            self.filters.len()
        );
    }

    fn list_mut(&mut self, category: ModuleCategory) -> &mut Vec<ModuleHandle> {
        match category {
            ModuleCategory::Tracker => &mut self.trackers,
            ModuleCategory::Protocol => &mut self.protocols,
            ModuleCategory::Filter => &mut self.filters,
        }
    }
}

/// Current choice within each category. `None` means nothing selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub tracker: Option<usize>,
    pub protocol: Option<usize>,
    pub filter: Option<usize>,
}

impl Selection {
    pub fn get(&self, category: ModuleCategory) -> Option<usize> {
        match category {
            ModuleCategory::Tracker => self.tracker,
            ModuleCategory::Protocol => self.protocol,
            ModuleCategory::Filter => self.filter,
        }
    }

    pub fn set(&mut self, category: ModuleCategory, index: Option<usize>) {
        match category {
            ModuleCategory::Tracker => self.tracker = index,
            ModuleCategory::Protocol => self.protocol = index,
            ModuleCategory::Filter => self.filter = index,
        }
    }

    /// Default selection: first tracker and protocol, no filter
    pub fn first_available(registry: &ModuleRegistry) -> Self {
        let first = |c| (!registry.list(c).is_empty()).then_some(0);
        Self {
            tracker: first(ModuleCategory::Tracker),
            protocol: first(ModuleCategory::Protocol),
            filter: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{mock_filter, mock_protocol, mock_tracker};

    fn registry() -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry
            .register(ModuleCategory::Tracker, mock_tracker("a").0)
            .unwrap();
        registry
            .register(ModuleCategory::Tracker, mock_tracker("b").0)
            .unwrap();
        registry
            .register(ModuleCategory::Protocol, mock_protocol("out").0)
            .unwrap();
        registry
    }

    #[test]
    fn test_list_keeps_registration_order() {
        let registry = registry();
        let ids: Vec<_> = registry
            .list(ModuleCategory::Tracker)
            .iter()
            .map(|m| m.id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(registry.list(ModuleCategory::Filter).is_empty());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_resolve_out_of_range_is_none() {
        let registry = registry();
        assert_eq!(
            registry
                .resolve(ModuleCategory::Tracker, Some(1))
                .map(|m| m.id().to_string()),
            Some("b".to_string())
        );
        assert!(registry.resolve(ModuleCategory::Tracker, Some(2)).is_none());
        assert!(registry.resolve(ModuleCategory::Tracker, None).is_none());
        assert!(registry.resolve(ModuleCategory::Filter, Some(0)).is_none());
    }

    #[test]
    fn test_register_rejects_wrong_category() {
        let mut registry = ModuleRegistry::new();
        let err = registry
            .register(ModuleCategory::Protocol, mock_filter("f").0)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::CategoryMismatch {
                module_id: "f".to_string(),
                expected: ModuleCategory::Protocol,
                actual: ModuleCategory::Filter,
            }
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_rejects_duplicate_id() {
        let mut registry = registry();
        let err = registry
            .register(ModuleCategory::Tracker, mock_tracker("a").0)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate { .. }));
    }

    #[test]
    fn test_index_of_and_first_available() {
        let registry = registry();
        assert_eq!(registry.index_of(ModuleCategory::Tracker, "b"), Some(1));
        assert_eq!(registry.index_of(ModuleCategory::Tracker, "zzz"), None);

        let selection = Selection::first_available(&registry);
        assert_eq!(selection.get(ModuleCategory::Tracker), Some(0));
        assert_eq!(selection.get(ModuleCategory::Protocol), Some(0));
        assert_eq!(selection.get(ModuleCategory::Filter), None);
    }
}
