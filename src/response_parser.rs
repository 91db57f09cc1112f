//! Key/value field extraction from model replies
//!
//! Models are prompted to answer as `key: value; key: value`. Replies are
//! messy in practice: wrapped in code fences, prefixed with a `<think>`
//! block, or written with full-width separators. [`KeyValueFieldParser`]
//! cleans those artifacts before splitting.
//!
//! The field schema itself belongs to the caller. The parser is either
//! configured with the known keys and their defaults, or run permissively
//! to keep every pair it finds.

use crate::logging::{log_debug, preview};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Parsed fields, keyed by field name
pub type FieldMap = BTreeMap<String, String>;

/// Turns one model reply into named fields
pub trait FieldParser: Send + Sync {
    fn parse(&self, text: &str) -> FieldMap;
}

static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("static regex is valid"));
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[A-Za-z]*").expect("static regex is valid"));
static PAIR_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[;；\n]").expect("static regex is valid"));
static KEY_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[:：]").expect("static regex is valid"));

/// Splits `key: value` pairs separated by `;` (ASCII or full-width)
#[derive(Debug, Clone, Default)]
pub struct KeyValueFieldParser {
    /// Known keys in schema order, each with its default value.
    fields: Vec<(String, String)>,
    permissive: bool,
}

impl KeyValueFieldParser {
    /// Parser for a fixed schema. Unknown keys are ignored and missing keys
    /// keep their default.
    pub fn new<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            permissive: false,
        }
    }

    /// Parser that keeps every pair it finds.
    pub fn permissive() -> Self {
        Self {
            fields: Vec::new(),
            permissive: true,
        }
    }

    pub fn is_permissive(&self) -> bool {
        self.permissive
    }

    /// Remove `<think>` blocks and code fences.
    pub fn clean(text: &str) -> String {
        let without_think = THINK_BLOCK.replace_all(text, "");
        CODE_FENCE.replace_all(&without_think, "").trim().to_string()
    }

    fn accepts(&self, key: &str) -> bool {
        self.permissive || self.fields.iter().any(|(known, _)| known == key)
    }
}

impl FieldParser for KeyValueFieldParser {
    fn parse(&self, text: &str) -> FieldMap {
        let mut result: FieldMap = self.fields.iter().cloned().collect();
        let cleaned = Self::clean(text);

        for pair in PAIR_SEPARATOR.split(&cleaned) {
            let pair = pair.trim();
            let Some(sep) = KEY_SEPARATOR.find(pair) else {
                continue;
            };
            let key = pair[..sep.start()].trim();
            let value = pair[sep.end()..].trim();
            if key.is_empty() || !self.accepts(key) {
                continue;
            }
            result.insert(key.to_string(), value.to_string());
        }

        log_debug!(
            text_preview = %preview(text, 80),
            fields = result.len(),
            "Parsed reply fields"
        );

        result
    }
}
