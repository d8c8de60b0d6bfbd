#![deny(unsafe_code)]

pub mod cache;
pub mod error;
pub mod hash;
pub mod key;
pub mod paths;
pub mod render;
pub mod store;
pub mod validate;

pub use crate::cache::{
    CacheEntry, CacheStatistics, CapacityEviction, EntryInfo, EvictionPolicy, NoEviction,
    TemplateCache,
};
pub use crate::error::TemplateError;
pub use crate::key::{DEFAULT_VERSION, TemplateKey};
pub use crate::paths::{TEMPLATES_ENV_VAR, bundled_templates_dir, templates_root};
pub use crate::render::{CompiledTemplate, RenderOutput, render};
pub use crate::store::{
    BuiltinTemplateStore, FsTemplateStore, LayeredTemplateStore, MemoryTemplateStore,
    TemplateStore,
};
pub use crate::validate::{
    TemplateValidator, ValidationIssue, ValidationResult, extract_variables,
};
