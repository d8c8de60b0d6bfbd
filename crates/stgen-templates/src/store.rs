//! Where template source comes from.
//!
//! The cache asks a [`TemplateStore`] for source text on a miss and never
//! touches the store again for that key until it is invalidated.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::error::TemplateError;
use crate::key::{DEFAULT_VERSION, TemplateKey};
use crate::paths::templates_root;

/// Source of template text keyed by [`TemplateKey`].
pub trait TemplateStore: Send + Sync {
    /// Returns the template source. A key the store does not hold must be
    /// reported as [`TemplateError::NotFound`] so layered stores can fall
    /// through.
    fn load(&self, key: &TemplateKey) -> Result<String, TemplateError>;

    /// Short description used in log lines and error messages.
    fn describe(&self) -> String;
}

impl<S: TemplateStore + ?Sized> TemplateStore for Box<S> {
    fn load(&self, key: &TemplateKey) -> Result<String, TemplateError> {
        (**self).load(key)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Reads `<root>/<TYPE>/<version>.tera`.
#[derive(Debug, Clone)]
pub struct FsTemplateStore {
    root: PathBuf,
}

impl FsTemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at [`templates_root`].
    pub fn from_env() -> Self {
        Self::new(templates_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &TemplateKey) -> PathBuf {
        self.root.join(key.type_tag()).join(key.file_name())
    }
}

fn check_path_component(key: &TemplateKey, component: &str) -> Result<(), TemplateError> {
    let bad = component.is_empty()
        || component == "."
        || component == ".."
        || component.contains(['/', '\\'])
        || component.contains(':');
    if bad {
        return Err(TemplateError::InvalidKey {
            key: key.clone(),
            message: format!("`{component}` is not a valid path component"),
        });
    }
    Ok(())
}

impl TemplateStore for FsTemplateStore {
    fn load(&self, key: &TemplateKey) -> Result<String, TemplateError> {
        check_path_component(key, key.type_tag())?;
        check_path_component(key, key.version())?;
        let path = self.path_for(key);
        debug!(template = %key, path = %path.display(), "reading template");
        match std::fs::read_to_string(&path) {
            Ok(source) => Ok(source),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(TemplateError::not_found(key, path.display().to_string()))
            }
            Err(err) => Err(TemplateError::io(key, path, err)),
        }
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Templates held in memory; handy for tests and embedding callers.
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    templates: HashMap<TemplateKey, String>,
    loads: AtomicUsize,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, type_tag: &str, version: &str, source: impl Into<String>) -> Self {
        self.insert(type_tag, version, source);
        self
    }

    pub fn insert(&mut self, type_tag: &str, version: &str, source: impl Into<String>) {
        self.templates
            .insert(TemplateKey::new(type_tag, version), source.into());
    }

    /// Number of successful loads served so far.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn load(&self, key: &TemplateKey) -> Result<String, TemplateError> {
        let source = self
            .templates
            .get(key)
            .ok_or_else(|| TemplateError::not_found(key, "memory"))?;
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(source.clone())
    }

    fn describe(&self) -> String {
        format!("memory ({} templates)", self.templates.len())
    }
}

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("AI", include_str!("../templates/AI/default.tera")),
    ("AO", include_str!("../templates/AO/default.tera")),
    ("DI", include_str!("../templates/DI/default.tera")),
    ("DO", include_str!("../templates/DO/default.tera")),
    ("TCP_AI", include_str!("../templates/TCP_AI/default.tera")),
    ("TCP_DI", include_str!("../templates/TCP_DI/default.tera")),
];

/// The `default` templates compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplateStore;

impl BuiltinTemplateStore {
    pub fn type_tags() -> impl Iterator<Item = &'static str> {
        BUILTIN_TEMPLATES.iter().map(|(tag, _)| *tag)
    }

    pub fn source(type_tag: &str) -> Option<&'static str> {
        BUILTIN_TEMPLATES
            .iter()
            .find(|(tag, _)| *tag == type_tag)
            .map(|(_, source)| *source)
    }
}

impl TemplateStore for BuiltinTemplateStore {
    fn load(&self, key: &TemplateKey) -> Result<String, TemplateError> {
        if key.version() != DEFAULT_VERSION {
            return Err(TemplateError::not_found(key, "built-in templates"));
        }
        Self::source(key.type_tag())
            .map(str::to_string)
            .ok_or_else(|| TemplateError::not_found(key, "built-in templates"))
    }

    fn describe(&self) -> String {
        "built-in templates".to_string()
    }
}

/// Tries each store in order; the first one holding the key wins.
///
/// Only `NotFound` falls through. Read and key errors from an earlier layer
/// are returned as is.
#[derive(Default)]
pub struct LayeredTemplateStore {
    layers: Vec<Box<dyn TemplateStore>>,
}

impl LayeredTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filesystem templates under `root`, then the built-in set.
    pub fn with_builtin_fallback(root: impl Into<PathBuf>) -> Self {
        Self::new()
            .layer(FsTemplateStore::new(root))
            .layer(BuiltinTemplateStore)
    }

    #[must_use]
    pub fn layer(mut self, store: impl TemplateStore + 'static) -> Self {
        self.layers.push(Box::new(store));
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl TemplateStore for LayeredTemplateStore {
    fn load(&self, key: &TemplateKey) -> Result<String, TemplateError> {
        for layer in &self.layers {
            match layer.load(key) {
                Err(err) if err.is_not_found() => continue,
                other => return other,
            }
        }
        Err(TemplateError::not_found(key, self.describe()))
    }

    fn describe(&self) -> String {
        let names: Vec<String> = self.layers.iter().map(|layer| layer.describe()).collect();
        names.join(" -> ")
    }
}
