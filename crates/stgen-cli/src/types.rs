use std::path::PathBuf;
use std::time::Duration;

use stgen_core::BatchOutput;
use stgen_templates::CacheStatistics;

#[derive(Debug)]
pub struct GenerateResult {
    pub points_file: PathBuf,
    pub templates: String,
    /// `None` when the code went to stdout.
    pub output: Option<PathBuf>,
    pub batch: BatchOutput,
    pub statistics: Option<CacheStatistics>,
    pub elapsed: Duration,
}

impl GenerateResult {
    pub fn has_errors(&self) -> bool {
        self.batch.has_failures()
    }
}
