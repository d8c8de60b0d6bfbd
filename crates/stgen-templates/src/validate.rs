//! Static checks over template text.
//!
//! The validator scans delimiters and block tags itself so it can report
//! every problem with a position, then lets the engine parse the text as a
//! final check. Referenced root variables are collected along the way and
//! compared against the fields a generator guarantees for the type.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use stgen_model::schema::known_fields;
use stgen_model::{SignalKind, SourceLocation};

use crate::error::TemplateError;
use crate::key::TemplateKey;
use crate::render::CompiledTemplate;

static ENDRAW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{%-?\s*endraw\s*-?%\}").expect("Invalid endraw regex"));

/// Names that never refer to a context field.
const RESERVED: &[&str] = &[
    "and", "or", "not", "in", "is", "true", "false", "True", "False", "none", "None", "loop",
    "self", "super", "__tera_context",
];

/// One finding with its position in the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub message: String,
    #[serde(skip)]
    pub location: SourceLocation,
}

impl ValidationIssue {
    fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.message, self.location)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    /// Root variables the template reads, sorted.
    pub required_fields: BTreeSet<String>,
    /// `loops * 3 + conditionals * 2 + substitutions`.
    pub complexity_score: u32,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TemplateValidator {
    engine_check: bool,
}

impl Default for TemplateValidator {
    fn default() -> Self {
        Self { engine_check: true }
    }
}

impl TemplateValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips the final engine parse; only the structural scan runs.
    #[must_use]
    pub fn without_engine_check(mut self) -> Self {
        self.engine_check = false;
        self
    }

    /// Validates against the field schema of a built-in type.
    pub fn validate(&self, text: &str, type_tag: &str) -> ValidationResult {
        let known = SignalKind::from_tag(type_tag).map(known_fields);
        self.run(text, type_tag, known.as_ref())
    }

    /// Validates against an explicit field set, for types registered at
    /// runtime.
    pub fn validate_with_fields(
        &self,
        text: &str,
        type_tag: &str,
        known: &BTreeSet<String>,
    ) -> ValidationResult {
        self.run(text, type_tag, Some(known))
    }

    fn run(&self, text: &str, type_tag: &str, known: Option<&BTreeSet<String>>) -> ValidationResult {
        let scan = Scanner::new(text).scan();
        let mut result = ValidationResult {
            errors: scan.errors,
            complexity_score: scan.loops * 3 + scan.conditionals * 2 + scan.substitutions,
            ..ValidationResult::default()
        };

        if text.trim().is_empty() {
            result
                .warnings
                .push(ValidationIssue::new("template is empty", SourceLocation::default()));
        }

        for (name, offset) in &scan.variables {
            if scan.locals.contains(name) {
                continue;
            }
            result.required_fields.insert(name.clone());
            if let Some(known) = known
                && !known.contains(name)
            {
                result.warnings.push(ValidationIssue::new(
                    format!("`{name}` is not a field provided for {type_tag}"),
                    location_at(text, *offset),
                ));
            }
        }
        if known.is_none() {
            result.warnings.push(ValidationIssue::new(
                format!("unknown signal type `{type_tag}`; field names not checked"),
                SourceLocation::default(),
            ));
        }

        if self.engine_check && result.errors.is_empty() {
            let key = TemplateKey::new(type_tag, "validation");
            if let Err(TemplateError::Compile {
                message, location, ..
            }) = CompiledTemplate::compile(key, text)
            {
                result.errors.push(ValidationIssue::new(message, location));
            }
        }
        result
    }
}

/// Root variables a template reads, excluding loop variables and `set`
/// targets.
pub fn extract_variables(text: &str) -> BTreeSet<String> {
    let scan = Scanner::new(text).scan();
    scan.variables
        .into_keys()
        .filter(|name| !scan.locals.contains(name))
        .collect()
}

fn location_at(text: &str, offset: usize) -> SourceLocation {
    let before = &text[..offset.min(text.len())];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);
    let column = before[line_start..].chars().count() + 1;
    SourceLocation::new(Some(line), Some(column))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Expression,
    Statement,
    Comment,
}

impl Delimiter {
    fn from_opener(opener: &str) -> Option<Self> {
        match opener {
            "{{" => Some(Delimiter::Expression),
            "{%" => Some(Delimiter::Statement),
            "{#" => Some(Delimiter::Comment),
            _ => None,
        }
    }

    fn opener(self) -> &'static str {
        match self {
            Delimiter::Expression => "{{",
            Delimiter::Statement => "{%",
            Delimiter::Comment => "{#",
        }
    }

    fn closer(self) -> &'static str {
        match self {
            Delimiter::Expression => "}}",
            Delimiter::Statement => "%}",
            Delimiter::Comment => "#}",
        }
    }
}

struct OpenBlock {
    keyword: &'static str,
    offset: usize,
}

#[derive(Default)]
struct ScanOutcome {
    errors: Vec<ValidationIssue>,
    /// First offset each root variable is read at.
    variables: BTreeMap<String, usize>,
    locals: BTreeSet<String>,
    loops: u32,
    conditionals: u32,
    substitutions: u32,
}

struct Scanner<'a> {
    text: &'a str,
    stack: Vec<OpenBlock>,
    out: ScanOutcome,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            stack: Vec::new(),
            out: ScanOutcome::default(),
        }
    }

    fn error(&mut self, message: String, offset: usize) {
        let location = location_at(self.text, offset);
        self.out.errors.push(ValidationIssue::new(message, location));
    }

    fn scan(mut self) -> ScanOutcome {
        let text = self.text;
        let mut pos = 0;
        while pos < text.len() {
            let Some(open) = find_opener(text, pos) else {
                self.check_literal(pos, text.len());
                break;
            };
            self.check_literal(pos, open);
            let delimiter = Delimiter::from_opener(&text[open..open + 2]);
            let Some(delimiter) = delimiter else {
                break;
            };
            let body_start = open + 2;
            let close = if delimiter == Delimiter::Comment {
                text[body_start..]
                    .find(delimiter.closer())
                    .map(|rel| body_start + rel)
            } else {
                find_unquoted(text, body_start, &[delimiter.closer()])
            };
            let Some(close) = close else {
                self.error(format!("unclosed `{}`", delimiter.opener()), open);
                break;
            };
            let body = &text[body_start..close];

            if delimiter != Delimiter::Comment
                && let Some(nested_rel) = find_unquoted(body, 0, &OPENERS)
            {
                self.error(format!("unclosed `{}`", delimiter.opener()), open);
                pos = body_start + nested_rel;
                continue;
            }

            pos = close + 2;
            match delimiter {
                Delimiter::Comment => {}
                Delimiter::Expression => {
                    self.out.substitutions += 1;
                    self.collect(strip_trim_markers(body), body_start);
                }
                Delimiter::Statement => {
                    if let Some(next) = self.statement(strip_trim_markers(body), open, pos) {
                        pos = next;
                    }
                }
            }
        }

        for block in std::mem::take(&mut self.stack) {
            self.error(format!("unclosed `{{% {} %}}`", block.keyword), block.offset);
        }
        self.out
    }

    /// Reports closers appearing in literal text.
    fn check_literal(&mut self, start: usize, end: usize) {
        let literal = &self.text[start..end];
        for closer in ["}}", "%}", "#}"] {
            if let Some(rel) = literal.find(closer) {
                self.error(format!("unmatched `{closer}`"), start + rel);
            }
        }
    }

    /// Handles one statement tag. Returns a new scan position when the
    /// statement swallows following text (`raw`).
    fn statement(&mut self, body: &'a str, offset: usize, after: usize) -> Option<usize> {
        let (keyword, rest) = match body.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (body, ""),
        };
        let rest_offset = offset + 2;
        match keyword {
            "for" => {
                self.out.loops += 1;
                self.stack.push(OpenBlock {
                    keyword: "for",
                    offset,
                });
                match rest.split_once(" in ") {
                    Some((targets, iterable)) => {
                        for target in targets.split(',') {
                            self.out.locals.insert(target.trim().to_string());
                        }
                        self.collect(iterable, rest_offset);
                    }
                    None => self.error("`for` without `in`".to_string(), offset),
                }
            }
            "if" => {
                self.out.conditionals += 1;
                self.stack.push(OpenBlock {
                    keyword: "if",
                    offset,
                });
                self.collect(rest, rest_offset);
            }
            "elif" => {
                self.out.conditionals += 1;
                if !self.top_is(&["if"]) {
                    self.error("`elif` outside of `if`".to_string(), offset);
                }
                self.collect(rest, rest_offset);
            }
            "else" => {
                if !self.top_is(&["if", "for"]) {
                    self.error("`else` outside of `if` or `for`".to_string(), offset);
                }
            }
            "set" | "set_global" => match rest.split_once('=') {
                Some((target, value)) => {
                    self.out.locals.insert(target.trim().to_string());
                    self.collect(value, rest_offset);
                }
                None => self.error(format!("`{keyword}` without `=`"), offset),
            },
            "macro" => {
                self.stack.push(OpenBlock {
                    keyword: "macro",
                    offset,
                });
                if let Some((_, args)) = rest.split_once('(') {
                    let args = args.trim_end().trim_end_matches(')');
                    for arg in args.split(',') {
                        let name = arg.split('=').next().unwrap_or_default().trim();
                        if !name.is_empty() {
                            self.out.locals.insert(name.to_string());
                        }
                    }
                }
            }
            "block" => self.stack.push(OpenBlock {
                keyword: "block",
                offset,
            }),
            "filter" => self.stack.push(OpenBlock {
                keyword: "filter",
                offset,
            }),
            "raw" => {
                return match ENDRAW_RE.find_at(self.text, after) {
                    Some(found) => Some(found.end()),
                    None => {
                        self.error("unclosed `{% raw %}`".to_string(), offset);
                        Some(self.text.len())
                    }
                };
            }
            "endfor" | "endif" | "endmacro" | "endblock" | "endfilter" => {
                self.close(&keyword[3..], offset);
            }
            "include" | "import" | "extends" | "break" | "continue" => {}
            other => self.error(format!("unknown statement `{other}`"), offset),
        }
        None
    }

    fn top_is(&self, keywords: &[&str]) -> bool {
        self.stack
            .last()
            .is_some_and(|block| keywords.contains(&block.keyword))
    }

    fn close(&mut self, keyword: &str, offset: usize) {
        match self.stack.iter().rposition(|block| block.keyword == keyword) {
            Some(index) => {
                let unclosed = self.stack.split_off(index + 1);
                self.stack.truncate(index);
                for block in unclosed {
                    self.error(format!("unclosed `{{% {} %}}`", block.keyword), block.offset);
                }
            }
            None => self.error(
                format!("`{{% end{keyword} %}}` without matching `{{% {keyword} %}}`"),
                offset,
            ),
        }
    }

    fn collect(&mut self, expr: &str, offset: usize) {
        for name in root_variables(expr) {
            self.out.variables.entry(name).or_insert(offset);
        }
    }
}

const OPENERS: [&str; 3] = ["{{", "{%", "{#"];

fn find_opener(text: &str, from: usize) -> Option<usize> {
    OPENERS
        .iter()
        .filter_map(|opener| text[from..].find(opener).map(|rel| from + rel))
        .min()
}

/// First occurrence of any of `needles` at or after `from` that is not
/// inside a string literal.
fn find_unquoted(text: &str, from: usize, needles: &[&str]) -> Option<usize> {
    let mut quote = None;
    for (rel, ch) in text[from..].char_indices() {
        let at = from + rel;
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if matches!(ch, '"' | '\'' | '`') => quote = Some(ch),
            None if needles.iter().any(|needle| text[at..].starts_with(needle)) => {
                return Some(at);
            }
            None => {}
        }
    }
    None
}

fn strip_trim_markers(body: &str) -> &str {
    let body = body.strip_prefix('-').unwrap_or(body);
    let body = body.strip_suffix('-').unwrap_or(body);
    body.trim()
}

/// Identifiers in an expression that name context variables: not
/// attributes, filters, functions, keyword arguments, tests or keywords.
fn root_variables(expr: &str) -> Vec<String> {
    let bytes = expr.as_bytes();
    let mut names = Vec::new();
    let mut previous_words: [&str; 2] = ["", ""];
    let mut i = 0;
    while i < bytes.len() {
        let ch = bytes[i];
        if matches!(ch, b'"' | b'\'' | b'`') {
            i = expr[i + 1..]
                .find(ch as char)
                .map_or(bytes.len(), |rel| i + 1 + rel + 1);
            continue;
        }
        if ch.is_ascii_digit() {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            continue;
        }
        if !(ch.is_ascii_alphabetic() || ch == b'_') {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
            i += 1;
        }
        let word = &expr[start..i];
        let before = expr[..start].trim_end().chars().next_back();
        let after_rest = expr[i..].trim_start();
        let after = after_rest.chars().next();

        let is_member = matches!(before, Some('.' | '|' | ':'));
        let is_call = after == Some('(') || after_rest.starts_with("::");
        let is_kwarg = after == Some('=') && !after_rest.starts_with("==");
        let is_test = previous_words[1] == "is"
            || (previous_words[1] == "not" && previous_words[0] == "is");
        let is_reserved = RESERVED.contains(&word);

        if !(is_member || is_call || is_kwarg || is_test || is_reserved) {
            names.push(word.to_string());
        }
        previous_words = [previous_words[1], word];
    }
    names
}
