//! Compiled templates and the renderer.
//!
//! Each [`CompiledTemplate`] owns a private `tera::Tera` holding exactly one
//! parsed template, so entries can be shared across threads and dropped
//! independently of each other.
//!
//! Besides the engine's built-in filters, templates can use `real`, which
//! prints a number as a REAL literal (`100` becomes `100.0`).

use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use stgen_model::{FieldMap, RenderError, SourceLocation, format_number};
use tera::{Context, Tera, Value};

use crate::error::TemplateError;
use crate::hash::sha256_hex;
use crate::key::TemplateKey;

/// Fixed per-entry overhead added to the source size estimate.
const ENTRY_OVERHEAD_BYTES: usize = 512;
/// Parsed templates are roughly this many times larger than their source.
const AST_SIZE_FACTOR: usize = 3;

/// Position marker in engine parse errors, e.g. ` --> 3:7`.
static LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-->\s*(\d+):(\d+)").expect("Invalid location regex"));

/// A parsed template ready for rendering.
pub struct CompiledTemplate {
    key: TemplateKey,
    name: String,
    engine: Tera,
    fingerprint: String,
    source_len: usize,
}

impl std::fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("key", &self.key)
            .field("fingerprint", &self.fingerprint)
            .field("source_len", &self.source_len)
            .finish_non_exhaustive()
    }
}

impl CompiledTemplate {
    /// Parses `source`. Syntax errors carry line and column when the engine
    /// reports them.
    pub fn compile(key: TemplateKey, source: &str) -> Result<Self, TemplateError> {
        let name = key.to_string();
        let mut engine = Tera::default();
        // Structured Text is not markup.
        engine.autoescape_on(Vec::new());
        engine.register_filter("real", real_filter);
        if let Err(err) = engine.add_raw_template(&name, source) {
            let message = error_chain(&err);
            return Err(TemplateError::Compile {
                location: location_in(&message),
                key,
                message,
            });
        }
        Ok(Self {
            name,
            engine,
            fingerprint: sha256_hex(source.as_bytes()),
            source_len: source.len(),
            key,
        })
    }

    pub fn key(&self) -> &TemplateKey {
        &self.key
    }

    /// Name the template is registered under, `TYPE/version`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// SHA-256 of the source text.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// Rough memory footprint of the parsed template.
    pub fn size_estimate(&self) -> usize {
        self.source_len * AST_SIZE_FACTOR + ENTRY_OVERHEAD_BYTES
    }
}

/// Rendered text plus how long the engine took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub text: String,
    pub elapsed: Duration,
}

/// Executes `template` against `fields`.
///
/// Every variable the template references must be present in `fields`;
/// unresolved references are errors, not blanks. Output uses `\n` line
/// endings and carries no trailing whitespace.
pub fn render(template: &CompiledTemplate, fields: &FieldMap) -> Result<RenderOutput, RenderError> {
    let started = Instant::now();
    let context =
        Context::from_serialize(fields).map_err(|err| render_error(template.name(), &err))?;
    let raw = template
        .engine
        .render(template.name(), &context)
        .map_err(|err| render_error(template.name(), &err))?;
    Ok(RenderOutput {
        text: normalize_output(&raw),
        elapsed: started.elapsed(),
    })
}

fn real_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .map(|number| Value::String(format_number(number)))
        .ok_or_else(|| tera::Error::msg(format!("filter `real` expects a number, got {value}")))
}

fn render_error(name: &str, err: &tera::Error) -> RenderError {
    let message = error_chain(err);
    let location = location_in(&message);
    RenderError::new(name, message).with_location(location)
}

/// Joins an error and all of its sources with `": "`.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn location_in(message: &str) -> SourceLocation {
    LOCATION_RE
        .captures(message)
        .map(|caps| {
            let line = caps.get(1).and_then(|m| m.as_str().parse().ok());
            let column = caps.get(2).and_then(|m| m.as_str().parse().ok());
            SourceLocation::new(line, column)
        })
        .unwrap_or_default()
}

fn normalize_output(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim_end()
        .to_string()
}
