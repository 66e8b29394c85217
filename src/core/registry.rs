//! Template registry: template id → generator capability.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::adapters::{ReferenceGenerator, TemplateGenerator};
use crate::domain::TemplateId;

/// Generators available to the orchestrator, plus optional fallbacks
#[derive(Clone, Default)]
pub struct TemplateRegistry {
    generators: IndexMap<TemplateId, Arc<dyn TemplateGenerator>>,
    fallbacks: IndexMap<TemplateId, Arc<dyn TemplateGenerator>>,
}

impl TemplateRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in generator for every template kind
    pub fn with_reference_generators() -> Self {
        let mut registry = Self::new();
        for generator in ReferenceGenerator::all() {
            registry.register(Arc::new(generator));
        }
        registry
    }

    /// Register a generator under its template, replacing any previous one
    pub fn register(&mut self, generator: Arc<dyn TemplateGenerator>) -> &mut Self {
        self.generators.insert(generator.template(), generator);
        self
    }

    /// Register a generator tried when the primary one gives up
    pub fn register_fallback(&mut self, generator: Arc<dyn TemplateGenerator>) -> &mut Self {
        self.fallbacks.insert(generator.template(), generator);
        self
    }

    pub fn get(&self, template: TemplateId) -> Option<Arc<dyn TemplateGenerator>> {
        self.generators.get(&template).cloned()
    }

    pub fn fallback(&self, template: TemplateId) -> Option<Arc<dyn TemplateGenerator>> {
        self.fallbacks.get(&template).cloned()
    }

    pub fn contains(&self, template: TemplateId) -> bool {
        self.generators.contains_key(&template)
    }

    pub fn has_fallback(&self, template: TemplateId) -> bool {
        self.fallbacks.contains_key(&template)
    }

    /// Registered templates, in registration order
    pub fn templates(&self) -> Vec<TemplateId> {
        self.generators.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("generators", &self.generators.keys().collect::<Vec<_>>())
            .field("fallbacks", &self.fallbacks.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_registry_covers_every_template() {
        let registry = TemplateRegistry::with_reference_generators();
        assert_eq!(registry.len(), TemplateId::ASSEMBLY_ORDER.len());
        for template in TemplateId::ASSEMBLY_ORDER {
            assert!(registry.contains(template));
            assert_eq!(registry.get(template).unwrap().template(), template);
            assert!(!registry.has_fallback(template));
        }
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = TemplateRegistry::new();
        registry
            .register(Arc::new(ReferenceGenerator::new(TemplateId::Chair)))
            .register(Arc::new(ReferenceGenerator::new(TemplateId::Chair)))
            .register_fallback(Arc::new(ReferenceGenerator::new(TemplateId::Chair)));
        assert_eq!(registry.templates(), vec![TemplateId::Chair]);
        assert!(registry.has_fallback(TemplateId::Chair));
        assert!(registry.fallback(TemplateId::Table).is_none());
    }
}
