use std::fmt;

use stgen_model::normalize_tag;

/// Version used when a caller does not pick one.
pub const DEFAULT_VERSION: &str = "default";

/// Identifies one template: normalized type tag plus version label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateKey {
    type_tag: String,
    version: String,
}

impl TemplateKey {
    /// The tag is normalized the same way the dispatcher does, so `ai` and
    /// `AI` share a cache slot. A blank version means [`DEFAULT_VERSION`].
    pub fn new(type_tag: &str, version: &str) -> Self {
        let version = version.trim();
        Self {
            type_tag: normalize_tag(type_tag),
            version: if version.is_empty() {
                DEFAULT_VERSION.to_string()
            } else {
                version.to_string()
            },
        }
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Template file name relative to the type directory.
    pub fn file_name(&self) -> String {
        format!("{}.tera", self.version)
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_tag, self.version)
    }
}
