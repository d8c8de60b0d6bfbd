use std::path::PathBuf;

use stgen_model::{GenerationError, SourceLocation};

use crate::key::TemplateKey;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template {key} not found in {location}")]
    NotFound { key: TemplateKey, location: String },

    #[error("failed to read template {key} from {path}: {source}")]
    Io {
        key: TemplateKey,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid template key {key}: {message}")]
    InvalidKey { key: TemplateKey, message: String },

    #[error("failed to compile template {key}{location}: {message}")]
    Compile {
        key: TemplateKey,
        message: String,
        location: SourceLocation,
    },
}

impl TemplateError {
    pub(crate) fn io(key: &TemplateKey, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            key: key.clone(),
            path: path.into(),
            source,
        }
    }

    pub(crate) fn not_found(key: &TemplateKey, location: impl Into<String>) -> Self {
        Self::NotFound {
            key: key.clone(),
            location: location.into(),
        }
    }

    pub fn key(&self) -> &TemplateKey {
        match self {
            TemplateError::NotFound { key, .. }
            | TemplateError::Io { key, .. }
            | TemplateError::InvalidKey { key, .. }
            | TemplateError::Compile { key, .. } => key,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TemplateError::NotFound { .. })
    }
}

impl From<TemplateError> for GenerationError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::Compile {
                key,
                message,
                location,
            } => GenerationError::TemplateCompile {
                key: key.to_string(),
                message,
                location,
            },
            other => GenerationError::TemplateLoad {
                key: other.key().to_string(),
                message: other.to_string(),
            },
        }
    }
}
