//! CLI argument definitions for `stgen`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use stgen_cli::logging::LogFormat;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(
    name = "stgen",
    version,
    about = "Generate IEC 61131-3 Structured Text from I/O point tables",
    long_about = "Generate IEC 61131-3 Structured Text from I/O point tables.\n\n\
                  Each point is rendered through the template of its signal type \
                  (AI, AO, DI, DO, TCP_AI, TCP_DI). Templates are read from \
                  <templates>/<TYPE>/<version>.tera, falling back to the built-in set."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate code for every point in a JSON point file.
    Generate(GenerateArgs),

    /// List supported signal types.
    Types,

    /// Check a template file for structural problems.
    CheckTemplate(CheckTemplateArgs),
}

#[derive(Parser)]
pub struct GenerateArgs {
    /// JSON file holding an array of point objects.
    #[arg(value_name = "POINTS")]
    pub points: PathBuf,

    /// Template directory (default: $STGEN_TEMPLATES_DIR or the bundled set).
    #[arg(long = "templates", value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// Template version to use for every type.
    #[arg(long = "template-version", value_name = "VERSION", default_value = "default")]
    pub template_version: String,

    /// Write generated code to this file instead of stdout.
    #[arg(long = "output", short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Number of worker threads.
    #[arg(long = "jobs", short = 'j', value_name = "N", default_value_t = 1)]
    pub jobs: usize,

    /// Stop at the first failed point.
    #[arg(long = "fail-fast")]
    pub fail_fast: bool,

    /// Print template cache statistics after the summary.
    #[arg(long = "stats")]
    pub stats: bool,
}

#[derive(Parser)]
pub struct CheckTemplateArgs {
    /// Template file to check.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Signal type whose fields the template may use.
    #[arg(long = "type", value_name = "TAG")]
    pub type_tag: String,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => Self::ERROR,
            LogLevelArg::Warn => Self::WARN,
            LogLevelArg::Info => Self::INFO,
            LogLevelArg::Debug => Self::DEBUG,
            LogLevelArg::Trace => Self::TRACE,
        }
    }
}

impl From<LogFormatArg> for LogFormat {
    fn from(format: LogFormatArg) -> Self {
        match format {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Compact => Self::Compact,
            LogFormatArg::Json => Self::Json,
        }
    }
}
