//! Entry point tying the registry, the template cache and batch driving
//! together.
//!
//! # Example
//!
//! ```ignore
//! use stgen_core::{CancelFlag, CodeGenerator};
//!
//! let generator = CodeGenerator::with_builtin_templates();
//! let output = generator.generate_batch(&records, &CancelFlag::new());
//! println!("{}", output.code());
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use stgen_model::{GenerationError, PointRecord, Result, normalize_tag};
use stgen_templates::{BuiltinTemplateStore, LayeredTemplateStore, TemplateCache};
use tracing::{debug, error, info};

use crate::options::GenerationOptions;
use crate::registry::GeneratorRegistry;

/// Cooperative cancellation, checked between records.
#[derive(Debug, Default)]
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Generated(String),
    Failed(GenerationError),
    /// Not attempted: the batch was cancelled or stopped by `fail_fast`.
    Skipped,
}

/// Outcome for one input record, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordResult {
    pub index: usize,
    pub signal_type: String,
    pub variable: String,
    pub outcome: RecordOutcome,
}

impl RecordResult {
    fn new(index: usize, record: &PointRecord, outcome: RecordOutcome) -> Self {
        Self {
            index,
            signal_type: normalize_tag(&record.signal_type),
            variable: record.display_name(),
            outcome,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match &self.outcome {
            RecordOutcome::Generated(code) => Some(code),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&GenerationError> {
        match &self.outcome {
            RecordOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Per-type tallies of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeCounts {
    pub generated: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput {
    results: Vec<RecordResult>,
    separator: String,
    cancelled: bool,
}

impl BatchOutput {
    pub fn results(&self) -> &[RecordResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<RecordResult> {
        self.results
    }

    /// Generated fragments joined with the separator, in input order.
    pub fn code(&self) -> String {
        let fragments: Vec<&str> = self.results.iter().filter_map(RecordResult::code).collect();
        fragments.join(&self.separator)
    }

    pub fn generated(&self) -> usize {
        self.count(|outcome| matches!(outcome, RecordOutcome::Generated(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, RecordOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, RecordOutcome::Skipped))
    }

    fn count(&self, predicate: impl Fn(&RecordOutcome) -> bool) -> usize {
        self.results
            .iter()
            .filter(|result| predicate(&result.outcome))
            .count()
    }

    pub fn errors(&self) -> impl Iterator<Item = (&RecordResult, &GenerationError)> + '_ {
        self.results
            .iter()
            .filter_map(|result| result.error().map(|err| (result, err)))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn by_type(&self) -> BTreeMap<String, TypeCounts> {
        let mut counts: BTreeMap<String, TypeCounts> = BTreeMap::new();
        for result in &self.results {
            let entry = counts.entry(result.signal_type.clone()).or_default();
            match result.outcome {
                RecordOutcome::Generated(_) => entry.generated += 1,
                RecordOutcome::Failed(_) => entry.failed += 1,
                RecordOutcome::Skipped => entry.skipped += 1,
            }
        }
        counts
    }
}

/// Generates Structured Text for point records.
#[derive(Debug)]
pub struct CodeGenerator {
    registry: GeneratorRegistry,
    cache: TemplateCache,
    options: GenerationOptions,
}

impl CodeGenerator {
    pub fn new(registry: GeneratorRegistry, cache: TemplateCache) -> Self {
        Self {
            registry,
            cache,
            options: GenerationOptions::default(),
        }
    }

    /// Built-in types rendered with the embedded templates.
    pub fn with_builtin_templates() -> Self {
        Self::new(
            GeneratorRegistry::with_builtin(),
            TemplateCache::new(BuiltinTemplateStore),
        )
    }

    /// Built-in types, templates from `root` with the embedded set as
    /// fallback.
    pub fn from_template_dir(root: impl Into<PathBuf>) -> Self {
        Self::new(
            GeneratorRegistry::with_builtin(),
            TemplateCache::new(LayeredTemplateStore::with_builtin_fallback(root)),
        )
    }

    #[must_use]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn is_supported(&self, type_tag: &str) -> bool {
        self.registry.is_supported(type_tag)
    }

    /// Generates one record.
    pub fn generate(&self, record: &PointRecord) -> Result<String> {
        let generator = self.registry.dispatch(&record.signal_type).inspect_err(|err| {
            error!(
                signal_type = %record.signal_type,
                variable = %record.display_name(),
                error = %err,
                "no generator for point"
            );
        })?;
        generator.generate(record, &self.cache, &self.options.template_version)
    }

    /// Generates records in order. Failures are collected and never abort
    /// the batch unless `fail_fast` is set.
    pub fn generate_batch(&self, records: &[PointRecord], cancel: &CancelFlag) -> BatchOutput {
        let stop = AtomicBool::new(false);
        let results = self.run_chunk(records, 0, cancel, &stop, &|| {});
        self.finish(results, cancel)
    }

    /// Like [`generate_batch`](Self::generate_batch) with a progress
    /// callback invoked after every record.
    pub fn generate_batch_with_progress(
        &self,
        records: &[PointRecord],
        cancel: &CancelFlag,
        on_record: &(dyn Fn() + Sync),
    ) -> BatchOutput {
        let stop = AtomicBool::new(false);
        let results = self.run_chunk(records, 0, cancel, &stop, on_record);
        self.finish(results, cancel)
    }

    /// Splits `records` into contiguous chunks over `workers` scoped threads.
    /// Results come back in input order.
    pub fn generate_parallel(
        &self,
        records: &[PointRecord],
        workers: usize,
        cancel: &CancelFlag,
    ) -> BatchOutput {
        self.generate_parallel_with_progress(records, workers, cancel, &|| {})
    }

    pub fn generate_parallel_with_progress(
        &self,
        records: &[PointRecord],
        workers: usize,
        cancel: &CancelFlag,
        on_record: &(dyn Fn() + Sync),
    ) -> BatchOutput {
        let workers = workers.clamp(1, records.len().max(1));
        if workers == 1 {
            return self.generate_batch_with_progress(records, cancel, on_record);
        }
        let chunk_size = records.len().div_ceil(workers);
        let stop = AtomicBool::new(false);
        debug!(records = records.len(), workers, chunk_size, "parallel generation");

        let results = std::thread::scope(|scope| {
            let handles: Vec<_> = records
                .chunks(chunk_size)
                .enumerate()
                .map(|(chunk, slice)| {
                    let stop = &stop;
                    scope.spawn(move || {
                        self.run_chunk(slice, chunk * chunk_size, cancel, stop, on_record)
                    })
                })
                .collect();
            let mut results = Vec::with_capacity(records.len());
            for handle in handles {
                match handle.join() {
                    Ok(chunk) => results.extend(chunk),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            results
        });
        self.finish(results, cancel)
    }

    fn run_chunk(
        &self,
        records: &[PointRecord],
        offset: usize,
        cancel: &CancelFlag,
        stop: &AtomicBool,
        on_record: &(dyn Fn() + Sync),
    ) -> Vec<RecordResult> {
        let mut results = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let index = offset + i;
            if cancel.is_cancelled() || stop.load(Ordering::SeqCst) {
                results.push(RecordResult::new(index, record, RecordOutcome::Skipped));
                continue;
            }
            let outcome = match self.generate(record) {
                Ok(code) => RecordOutcome::Generated(code),
                Err(err) => {
                    if self.options.fail_fast {
                        stop.store(true, Ordering::SeqCst);
                    }
                    RecordOutcome::Failed(err)
                }
            };
            results.push(RecordResult::new(index, record, outcome));
            on_record();
        }
        results
    }

    fn finish(&self, results: Vec<RecordResult>, cancel: &CancelFlag) -> BatchOutput {
        let output = BatchOutput {
            results,
            separator: self.options.separator.clone(),
            cancelled: cancel.is_cancelled(),
        };
        info!(
            generated = output.generated(),
            failed = output.failed(),
            skipped = output.skipped(),
            cancelled = output.cancelled,
            "batch finished"
        );
        output
    }
}
