use std::io::{self, IsTerminal};
use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, info_span, warn};

use stgen_cli::points::load_points;
use stgen_core::{CancelFlag, CodeGenerator, GenerationOptions, GeneratorRegistry};
use stgen_templates::{TemplateValidator, ValidationResult, templates_root};

use crate::cli::{CheckTemplateArgs, GenerateArgs};
use crate::summary::apply_table_style;
use crate::types::GenerateResult;

pub fn run_types() -> Result<()> {
    let registry = GeneratorRegistry::with_builtin();
    let mut table = Table::new();
    table.set_header(vec!["Type", "Aliases", "Description", "Channel fallback", "Required"]);
    apply_table_style(&mut table);
    for generator in registry.iter() {
        let spec = generator.spec();
        let required: Vec<String> = spec
            .required_fields()
            .iter()
            .map(|field| field.candidates().collect::<Vec<_>>().join(" | "))
            .collect();
        table.add_row(vec![
            spec.type_tag().to_string(),
            spec.aliases().join(", "),
            spec.description().to_string(),
            spec.fallback_channel().to_string(),
            required.join(", "),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_generate(args: &GenerateArgs) -> Result<GenerateResult> {
    let span = info_span!("generate", points = %args.points.display());
    let _guard = span.enter();
    let started = Instant::now();

    let records = load_points(&args.points)?;
    info!(count = records.len(), "points loaded");

    let root = args.templates.clone().unwrap_or_else(templates_root);
    let options = GenerationOptions::new()
        .with_template_version(args.template_version.clone())
        .with_fail_fast(args.fail_fast);
    let generator = CodeGenerator::from_template_dir(root).with_options(options);
    let templates = generator.cache().store().describe();

    let progress = progress_bar(records.len() as u64);
    let cancel = CancelFlag::new();
    let on_record = || progress.inc(1);
    let batch = {
        let _stage = info_span!("render", jobs = args.jobs).entered();
        if args.jobs > 1 {
            generator.generate_parallel_with_progress(&records, args.jobs, &cancel, &on_record)
        } else {
            generator.generate_batch_with_progress(&records, &cancel, &on_record)
        }
    };
    progress.finish_and_clear();

    let code = batch.code();
    match &args.output {
        Some(path) => {
            let mut text = code;
            if !text.is_empty() {
                text.push('\n');
            }
            std::fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
            info!(path = %path.display(), "code written");
        }
        None => {
            if !code.is_empty() {
                println!("{code}");
            }
        }
    }
    if batch.has_failures() {
        warn!(failed = batch.failed(), "some points were not generated");
    }

    Ok(GenerateResult {
        points_file: args.points.clone(),
        templates,
        output: args.output.clone(),
        statistics: args.stats.then(|| generator.cache().get_statistics()),
        batch,
        elapsed: started.elapsed(),
    })
}

pub fn run_check_template(args: &CheckTemplateArgs) -> Result<ValidationResult> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("read template {}", args.file.display()))?;
    Ok(TemplateValidator::new().validate(&text, &args.type_tag))
}

fn progress_bar(len: u64) -> ProgressBar {
    if !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} points")
    {
        bar.set_style(style);
    }
    bar
}
