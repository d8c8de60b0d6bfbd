//! `stgen`: Structured Text point code generator.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use stgen_cli::logging::{LogConfig, init_logging};

mod cli;
mod commands;
mod summary;
mod types;

use crate::cli::{Cli, Command};
use crate::commands::{run_check_template, run_generate, run_types};
use crate::summary::{print_summary, print_validation};

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli.color.write_global();
    run(&cli).unwrap_or_else(|error| {
        eprintln!("error: {error:#}");
        ExitCode::FAILURE
    })
}

fn run(cli: &Cli) -> Result<ExitCode> {
    init_logging(&log_config_from_cli(cli)).context("failed to initialize logging")?;

    let success = match &cli.command {
        Command::Generate(args) => {
            let result = run_generate(args)?;
            print_summary(&result);
            !result.has_errors()
        }
        Command::Types => {
            run_types()?;
            true
        }
        Command::CheckTemplate(args) => {
            let result = run_check_template(args)?;
            print_validation(&result, &args.type_tag);
            result.is_valid()
        }
    };
    Ok(if success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// `--log-level` wins over `-v`/`-q`; either one disables `RUST_LOG`.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let level_filter = cli
        .log_level
        .map_or_else(|| cli.verbosity.tracing_level_filter(), Into::into);
    let with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    LogConfig::default()
        .with_level_filter(level_filter)
        .with_env_filter(!(cli.verbosity.is_present() || cli.log_level.is_some()))
        .with_format(cli.log_format.into())
        .with_ansi(with_ansi)
        .with_log_file(cli.log_file.clone())
}
