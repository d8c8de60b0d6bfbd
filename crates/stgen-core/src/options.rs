use stgen_templates::DEFAULT_VERSION;

/// Batch-wide generation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Template version looked up for every type.
    pub template_version: String,
    /// Text placed between fragments when a batch is joined.
    pub separator: String,
    /// Stop at the first failed record; the rest are reported as skipped.
    pub fail_fast: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            template_version: DEFAULT_VERSION.to_string(),
            separator: "\n\n".to_string(),
            fail_fast: false,
        }
    }
}

impl GenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template_version(mut self, version: impl Into<String>) -> Self {
        self.template_version = version.into();
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}
