//! Generator registry and dispatch.
//!
//! The registry maps type tags and their aliases to generators. It is built
//! explicitly by whoever owns the pipeline, usually through
//! [`GeneratorRegistry::with_builtin`], and is immutable once shared.
//!
//! # Example
//!
//! ```ignore
//! use stgen_core::GeneratorRegistry;
//!
//! let registry = GeneratorRegistry::with_builtin();
//! let generator = registry.dispatch("ai")?;
//! assert_eq!(generator.type_tag(), "AI");
//! ```

use std::collections::HashMap;

use stgen_model::{GenerationError, SignalKind, normalize_tag};
use tracing::{debug, error};

use crate::generator::{Generator, GeneratorSpec};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("signal type {tag} is already registered for {existing}")]
    DuplicateType { tag: String, existing: String },

    #[error("signal type tag must not be empty")]
    EmptyTag,
}

/// Generators indexed by normalized type tag and alias.
#[derive(Debug, Clone, Default)]
pub struct GeneratorRegistry {
    generators: Vec<Generator>,
    index: HashMap<String, usize>,
}

impl GeneratorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the six built-in signal types.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for kind in SignalKind::ALL {
            if let Err(err) = registry.register(GeneratorSpec::builtin(kind)) {
                error!(signal_type = kind.tag(), error = %err, "built-in generator not registered");
            }
        }
        registry
    }

    /// Adds a generator for `spec`. A tag or alias that is already taken is
    /// rejected and the registry is left unchanged.
    pub fn register(&mut self, spec: GeneratorSpec) -> Result<(), RegistryError> {
        if spec.type_tag().is_empty() {
            return Err(RegistryError::EmptyTag);
        }
        let mut names: Vec<String> = Vec::with_capacity(spec.aliases().len() + 1);
        for name in std::iter::once(spec.type_tag()).chain(spec.aliases().iter().map(String::as_str)) {
            let name = normalize_tag(name);
            if let Some(&existing) = self.index.get(&name) {
                return Err(RegistryError::DuplicateType {
                    tag: name,
                    existing: self.generators[existing].type_tag().to_string(),
                });
            }
            if names.contains(&name) {
                return Err(RegistryError::DuplicateType {
                    existing: spec.type_tag().to_string(),
                    tag: name,
                });
            }
            names.push(name);
        }

        let position = self.generators.len();
        debug!(signal_type = spec.type_tag(), aliases = ?spec.aliases(), "generator registered");
        self.generators.push(Generator::new(spec));
        for name in names {
            self.index.insert(name, position);
        }
        Ok(())
    }

    /// Looks a tag up case-insensitively, ignoring surrounding whitespace.
    pub fn get(&self, type_tag: &str) -> Option<&Generator> {
        self.index
            .get(&normalize_tag(type_tag))
            .map(|&position| &self.generators[position])
    }

    /// Returns the generator for `type_tag` or `UnsupportedType`.
    pub fn dispatch(&self, type_tag: &str) -> Result<&Generator, GenerationError> {
        self.get(type_tag)
            .ok_or_else(|| GenerationError::unsupported_type(type_tag.trim()))
    }

    pub fn is_supported(&self, type_tag: &str) -> bool {
        self.get(type_tag).is_some()
    }

    /// Canonical tags in registration order.
    pub fn type_tags(&self) -> impl Iterator<Item = &str> + '_ {
        self.generators.iter().map(Generator::type_tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Generator> + '_ {
        self.generators.iter()
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_six_types() {
        let registry = GeneratorRegistry::with_builtin();
        assert_eq!(registry.len(), 6);
        let tags: Vec<_> = registry.type_tags().collect();
        assert_eq!(tags, vec!["AI", "AO", "DI", "DO", "TCP_AI", "TCP_DI"]);
    }

    #[test]
    fn builtin_tags_and_aliases_never_collide() {
        let mut seen = std::collections::HashSet::new();
        for kind in SignalKind::ALL {
            for name in std::iter::once(kind.tag()).chain(kind.aliases().iter().copied()) {
                assert!(seen.insert(normalize_tag(name)), "{name} is claimed twice");
            }
        }
        let registry = GeneratorRegistry::with_builtin();
        for name in &seen {
            assert!(registry.is_supported(name), "{name} was dropped");
        }
    }

    #[test]
    fn aliases_dispatch_to_canonical_generator() {
        let registry = GeneratorRegistry::with_builtin();
        assert_eq!(registry.dispatch("tcp analog").unwrap().type_tag(), "TCP_AI");
        assert_eq!(registry.dispatch("TCPDI").unwrap().type_tag(), "TCP_DI");
        assert_eq!(
            registry.dispatch(" AX ").unwrap_err(),
            GenerationError::unsupported_type("AX")
        );
    }

    #[test]
    fn empty_registry_supports_nothing() {
        let registry = GeneratorRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.is_supported("AI"));
    }

    #[test]
    fn duplicate_alias_within_spec_is_rejected() {
        let mut registry = GeneratorRegistry::new();
        let spec = GeneratorSpec::custom("PUMP", SignalKind::DigitalOutput).with_alias("pump");
        assert!(matches!(
            registry.register(spec),
            Err(RegistryError::DuplicateType { .. })
        ));
        assert!(registry.is_empty());
    }
}
