//! Node registry - the class and display-name mappings handed to the host

use std::sync::Arc;

use indexmap::IndexMap;

use super::class::NodeClass;

/// Registered nodes keyed by class name
///
/// Both maps always hold the same key set; [`NodeRegistry::register`] is the
/// only way in. Keys keep the order they were first registered in.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    classes: IndexMap<String, Arc<NodeClass>>,
    display_names: IndexMap<String, String>,
}

impl NodeRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `class` under its name with `label`
    ///
    /// An existing entry is overwritten in both maps; the displaced class is
    /// returned.
    pub fn register(&mut self, class: Arc<NodeClass>, label: String) -> Option<Arc<NodeClass>> {
        let key = class.name().to_string();
        self.display_names.insert(key.clone(), label);
        self.classes.insert(key, class)
    }

    /// Get a node class by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<NodeClass>> {
        self.classes.get(name)
    }

    /// Get a node's display label
    #[must_use]
    pub fn display_name(&self, name: &str) -> Option<&str> {
        self.display_names.get(name).map(String::as_str)
    }

    /// Whether a node is registered under `name`
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Name → class mapping
    #[must_use]
    pub const fn class_mappings(&self) -> &IndexMap<String, Arc<NodeClass>> {
        &self.classes
    }

    /// Name → display label mapping
    #[must_use]
    pub const fn display_name_mappings(&self) -> &IndexMap<String, String> {
        &self.display_names
    }

    /// Registered names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// Number of registered nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no nodes are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::Map;

    use super::*;

    fn class(name: &str, module: &str) -> Arc<NodeClass> {
        Arc::new(NodeClass::new(name, module, Path::new("/pack/x.json"), Map::new()))
    }

    #[test]
    fn register_fills_both_maps() {
        let mut registry = NodeRegistry::new();
        assert!(registry.is_empty());

        let displaced = registry.register(class("FooNode", "luy_scan.a"), "Luy-FooNode".to_string());
        assert!(displaced.is_none());

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("FooNode"));
        assert_eq!(registry.display_name("FooNode"), Some("Luy-FooNode"));
        assert!(
            registry
                .class_mappings()
                .keys()
                .eq(registry.display_name_mappings().keys())
        );
    }

    #[test]
    fn later_registration_wins_and_returns_displaced() {
        let mut registry = NodeRegistry::new();
        registry.register(class("FooNode", "luy_scan.a"), "first".to_string());
        registry.register(class("BarNode", "luy_scan.a"), "bar".to_string());

        let displaced = registry
            .register(class("FooNode", "luy_scan.b"), "second".to_string())
            .unwrap();

        assert_eq!(displaced.id().module, "luy_scan.a");
        assert_eq!(registry.get("FooNode").unwrap().id().module, "luy_scan.b");
        assert_eq!(registry.display_name("FooNode"), Some("second"));
        assert_eq!(registry.len(), 2);
        // overwritten key keeps its original slot
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["FooNode", "BarNode"]);
    }
}
