//! Field qualifiers of the form `field:value`.
//!
//! Users may restrict a keyword to one field, either the primary content field or one of
//! the extension fields derived from media (OCR, ASR, QR transcripts). Short aliases map
//! to canonical field names:
//!
//! | Alias | Field |
//! |-------|-------|
//! | `content` | `Content` |
//! | `ocr` | `Ext_OCR_Result` |
//! | `asr` | `Ext_ASR_Result` |
//! | `qr` | `Ext_QR_Result` |
//!
//! Only `Content` and names carrying the [`EXTENSION_PREFIX`] are valid targets. Anything
//! else is reported by [`is_valid`] and must not be matched against the index.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Canonical name of the primary text field.
pub const CONTENT_FIELD: &str = "Content";

/// Marker prefix carried by every extension field name.
pub const EXTENSION_PREFIX: &str = "Ext_";

/// Matches `word:value` fragments anywhere in a query.
static FIELD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+):(\S+)").expect("field pattern is valid"));

/// A single `field:value` qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name after alias resolution.
    pub name: String,
    /// Raw value to search for in that field.
    pub value: String,
}

impl FieldSpec {
    /// Creates a field spec without resolving aliases.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns true if this spec targets the content field.
    pub fn is_content(&self) -> bool {
        self.name.eq_ignore_ascii_case(CONTENT_FIELD)
    }

    /// Returns true if this spec targets an extension field.
    pub fn is_extension(&self) -> bool {
        has_extension_prefix(&self.name)
    }
}

/// Returns true if `name` starts with the extension marker, ignoring ASCII case.
fn has_extension_prefix(name: &str) -> bool {
    name.get(..EXTENSION_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(EXTENSION_PREFIX))
}

/// Resolves a field alias to its canonical name.
///
/// Matching is case-insensitive. Unknown names are returned unchanged, so resolution is
/// idempotent.
pub fn resolve_alias(name: &str) -> String {
    match name.to_lowercase().as_str() {
        "content" => CONTENT_FIELD.to_string(),
        "ocr" => "Ext_OCR_Result".to_string(),
        "asr" => "Ext_ASR_Result".to_string(),
        "qr" => "Ext_QR_Result".to_string(),
        _ => name.to_string(),
    }
}

/// Parses one `field:value` fragment.
///
/// Splits on the first colon only and trims both halves. Returns `None` when there is no
/// colon or either half is blank.
pub fn parse_one(fragment: &str) -> Option<FieldSpec> {
    let (name, value) = fragment.split_once(':')?;
    let name = name.trim();
    let value = value.trim();
    if name.is_empty() || value.is_empty() {
        return None;
    }
    Some(FieldSpec::new(resolve_alias(name), value))
}

/// Finds every non-overlapping `field:value` fragment in a query.
pub fn parse_all(query: &str) -> Vec<FieldSpec> {
    FIELD_PATTERN
        .find_iter(query)
        .filter_map(|m| parse_one(m.as_str()))
        .collect()
}

/// Extracts every field qualifier and returns the remaining free text.
///
/// Matched fragments are cut out of the query and the leftover words are rejoined with
/// single spaces.
pub fn extract(query: &str) -> (Vec<FieldSpec>, String) {
    let mut specs = Vec::new();
    let mut remaining = String::with_capacity(query.len());
    let mut last = 0;

    for m in FIELD_PATTERN.find_iter(query) {
        if let Some(spec) = parse_one(m.as_str()) {
            specs.push(spec);
            remaining.push_str(&query[last..m.start()]);
            remaining.push(' ');
            last = m.end();
        }
    }
    remaining.push_str(&query[last..]);

    (specs, remaining.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Checks that a spec may be matched against the index.
///
/// Both halves must be non-blank and the field must be `Content` or an extension field.
/// Rejected specs are logged.
pub fn is_valid(spec: &FieldSpec) -> bool {
    if spec.name.trim().is_empty() || spec.value.trim().is_empty() {
        warn!(field = %spec.name, value = %spec.value, "ignoring blank field qualifier");
        return false;
    }
    if spec.is_content() || spec.is_extension() {
        return true;
    }
    warn!(field = %spec.name, "ignoring qualifier for unknown field");
    false
}
