use std::fmt;

use thiserror::Error;

/// Line/column of a fault inside template source, when the engine reports one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl SourceLocation {
    pub fn new(line: Option<usize>, column: Option<usize>) -> Self {
        Self { line, column }
    }

    pub fn is_known(&self) -> bool {
        self.line.is_some()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, " at line {line}, column {column}"),
            (Some(line), None) => write!(f, " at line {line}"),
            _ => Ok(()),
        }
    }
}

/// A compiled template failed while executing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to render template {template}{location}: {message}")]
pub struct RenderError {
    pub template: String,
    pub message: String,
    pub location: SourceLocation,
}

impl RenderError {
    pub fn new(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            message: message.into(),
            location: SourceLocation::default(),
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }
}

/// Per-record generation failures. None of these abort a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("missing required field `{field}` for variable {variable}")]
    MissingField { field: String, variable: String },

    #[error("unsupported signal type: {tag:?}")]
    UnsupportedType { tag: String },

    #[error("failed to load template {key}: {message}")]
    TemplateLoad { key: String, message: String },

    #[error("failed to compile template {key}{location}: {message}")]
    TemplateCompile {
        key: String,
        message: String,
        location: SourceLocation,
    },

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl GenerationError {
    pub fn missing_field(field: impl Into<String>, variable: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
            variable: variable.into(),
        }
    }

    pub fn unsupported_type(tag: impl Into<String>) -> Self {
        Self::UnsupportedType { tag: tag.into() }
    }

    /// Short machine-readable category, used for summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::MissingField { .. } => "missing_field",
            GenerationError::UnsupportedType { .. } => "unsupported_type",
            GenerationError::TemplateLoad { .. } => "template_load",
            GenerationError::TemplateCompile { .. } => "template_compile",
            GenerationError::Render(_) => "render",
        }
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
