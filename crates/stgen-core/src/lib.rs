#![deny(unsafe_code)]

pub mod channel;
pub mod generator;
pub mod options;
pub mod pipeline;
pub mod registry;

pub use crate::channel::{HardChannel, SENTINEL_CHANNEL, resolve_channel};
pub use crate::generator::{Generator, GeneratorSpec};
pub use crate::options::GenerationOptions;
pub use crate::pipeline::{
    BatchOutput, CancelFlag, CodeGenerator, RecordOutcome, RecordResult, TypeCounts,
};
pub use crate::registry::{GeneratorRegistry, RegistryError};
