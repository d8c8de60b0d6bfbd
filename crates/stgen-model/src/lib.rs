//! Data model for Structured Text point generation: point records, loosely
//! typed field maps with typed accessors, signal kinds, the per-type field
//! schema and the generation error taxonomy.

pub mod error;
pub mod record;
pub mod schema;
pub mod signal;
pub mod value;

pub use error::{GenerationError, RenderError, Result, SourceLocation};
pub use record::{PointRecord, Thresholds};
pub use schema::{RequiredField, ThresholdField};
pub use signal::{SignalKind, normalize_tag};
pub use value::{FieldMap, FieldValue, format_number};
