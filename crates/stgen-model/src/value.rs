//! Dynamically typed field values and the accessor / defaulting helpers used
//! by every stage that reads a point row.
//!
//! Import layers hand the pipeline loosely typed rows: the same threshold may
//! arrive as `100`, `100.0` or `"100"`, and an empty cell may be `null`, `""`
//! or missing altogether. [`FieldMap`] hides those differences behind a small
//! set of typed accessors so the generator code never matches on raw values.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Text view of scalar values. Lists, maps and null have none.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            FieldValue::Text(value) => Some(Cow::Borrowed(value.as_str())),
            FieldValue::Integer(value) => Some(Cow::Owned(value.to_string())),
            FieldValue::Number(value) => Some(Cow::Owned(format_number(*value))),
            FieldValue::Bool(value) => Some(Cow::Owned(value.to_string())),
            FieldValue::Null | FieldValue::List(_) | FieldValue::Map(_) => None,
        }
    }

    /// Numeric view. Text is parsed after trimming; booleans are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            FieldValue::Integer(value) => Some(*value as f64),
            FieldValue::Text(value) => value.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Boolean view accepting the spellings spreadsheets tend to use.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(value) => Some(*value),
            FieldValue::Integer(0) => Some(false),
            FieldValue::Integer(1) => Some(true),
            FieldValue::Text(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" | "on" => Some(true),
                "false" | "no" | "n" | "0" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// True for null, whitespace-only text and empty lists or maps.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(value) => value.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Map(entries) => entries.is_empty(),
            _ => false,
        }
    }
}

/// Formats a number the way it should appear in generated code: integral
/// values keep one decimal so they remain REAL literals.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            FieldValue::Map(entries) => {
                let parts: Vec<String> = entries.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            other => write!(f, "{}", other.as_text().unwrap_or_default()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        FieldValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Field name to value map with typed accessors.
///
/// Keys are kept sorted so rendering contexts and snapshots are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap {
    fields: BTreeMap<String, FieldValue>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(key.into(), value.into())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Case-insensitive lookup, exact match first.
    pub fn get_ignore_case(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key).or_else(|| {
            self.fields
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key))
                .map(|(_, value)| value)
        })
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FieldValue> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }

    /// Trimmed, non-empty text for `key`.
    pub fn text(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .and_then(FieldValue::as_text)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    pub fn text_or(&self, key: &str, default: &str) -> String {
        self.text(key).unwrap_or_else(|| default.to_string())
    }

    /// First non-empty text among `keys`, with the key that supplied it.
    pub fn first_text<'k>(&self, keys: &[&'k str]) -> Option<(&'k str, String)> {
        keys.iter()
            .find_map(|key| self.text(key).map(|value| (*key, value)))
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(FieldValue::as_f64)
    }

    pub fn number_or(&self, key: &str, default: f64) -> f64 {
        self.number(key).unwrap_or(default)
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(FieldValue::as_bool)
    }

    /// True when `key` is absent or blank.
    pub fn is_missing(&self, key: &str) -> bool {
        self.fields.get(key).is_none_or(FieldValue::is_blank)
    }

    /// Inserts `value` only when `key` is absent or blank. Returns whether it
    /// was applied.
    pub fn set_default(&mut self, key: &str, value: impl Into<FieldValue>) -> bool {
        if self.is_missing(key) {
            self.fields.insert(key.to_string(), value.into());
            true
        } else {
            false
        }
    }

    /// Numeric default where zero also counts as unset. Non-numeric values
    /// are replaced as well.
    pub fn set_number_default(&mut self, key: &str, default: f64) -> bool {
        match self.number(key) {
            Some(value) if value != 0.0 => false,
            _ => {
                self.fields.insert(key.to_string(), FieldValue::Number(default));
                true
            }
        }
    }

    /// Copies every entry of `other` into `self`, overwriting on conflict.
    pub fn merge(&mut self, other: FieldMap) {
        self.fields.extend(other.fields);
    }
}

impl FromIterator<(String, FieldValue)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, FieldValue)> for FieldMap {
    fn extend<I: IntoIterator<Item = (String, FieldValue)>>(&mut self, iter: I) {
        self.fields.extend(iter);
    }
}

impl IntoIterator for FieldMap {
    type Item = (String, FieldValue);
    type IntoIter = btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldMap {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = btree_map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl From<BTreeMap<String, FieldValue>> for FieldMap {
    fn from(fields: BTreeMap<String, FieldValue>) -> Self {
        Self { fields }
    }
}
