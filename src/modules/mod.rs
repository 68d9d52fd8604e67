//! Built-in modules and discovery

pub mod ewma;
pub mod sine;
pub mod udp;

use std::sync::Arc;

use crate::core::module::{ModuleCategory, ModuleDescriptor, ModuleLibrary};
use crate::core::{ModuleRegistry, RegistryError};

use ewma::EwmaFilter;
use sine::SineTracker;
use udp::UdpProtocol;

/// Everything discovery finds, in presentation order
pub fn builtin_descriptors() -> Vec<ModuleDescriptor> {
    vec![
        ModuleDescriptor::new(
            "sine",
            "Sine wave (test)",
            ModuleLibrary::Tracker(Arc::new(SineTracker::new())),
        ),
        ModuleDescriptor::new(
            "udp",
            "UDP over network",
            ModuleLibrary::Protocol(Arc::new(UdpProtocol::new())),
        ),
        ModuleDescriptor::new(
            "ewma",
            "Exponential smoothing",
            ModuleLibrary::Filter(Arc::new(EwmaFilter::new())),
        ),
    ]
}

/// Scan for modules and build the registry
pub fn discover() -> Result<ModuleRegistry, RegistryError> {
    let mut registry = ModuleRegistry::new();
    for descriptor in builtin_descriptors() {
        let category: ModuleCategory = descriptor.category();
        registry.register(category, descriptor)?;
    }
    registry.log_summary();
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_fills_each_category() {
        let registry = discover().unwrap();
        for &category in ModuleCategory::all() {
            assert_eq!(registry.list(category).len(), 1, "{}", category);
        }
        assert_eq!(registry.index_of(ModuleCategory::Protocol, "udp"), Some(0));
    }

    #[test]
    fn test_builtin_dialogs_construct() {
        let registry = discover().unwrap();
        for &category in ModuleCategory::all() {
            let module = registry.resolve(category, Some(0)).unwrap();
            assert!(!module.create_dialog().unwrap().title().is_empty());
        }
    }
}
