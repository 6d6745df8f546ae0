//! Query building blocks over the content and extension fields.
//!
//! Builders take keywords that have already been through the chat analyzer and produce
//! tantivy queries scoped to one tenant. Extension fields are looked up through the
//! [`ExtensionFieldRegistry`], so a tenant without OCR or speech transcripts never pays for
//! per-field clauses.

use std::slice;

use chatdex_query::{FieldSpec, is_valid};
use once_cell::{sync::Lazy, unsync::OnceCell};
use regex::Regex;
use tantivy::{
    query::{BooleanQuery, Occur, PhraseQuery, Query, TermQuery},
    schema::IndexRecordOption,
};
use tracing::debug;

use crate::{
    registry::{ExtensionFieldRegistry, FieldNameSource},
    schema::{FieldTarget, IndexSchema},
    tokenizer::tokenize,
};

/// Matches double-quoted phrases.
static PHRASE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]*)""#).expect("phrase pattern is valid"));

/// Everything a builder needs to know about the tenant being searched.
pub struct QueryContext<'a> {
    /// Tenant id.
    tenant: i64,
    /// Field handles.
    schema: &'a IndexSchema,
    /// Shared extension field cache.
    registry: &'a ExtensionFieldRegistry,
    /// The tenant's index, for cache misses.
    source: &'a dyn FieldNameSource,
    /// Extension fields, resolved once per context.
    fields: OnceCell<Vec<String>>,
}

impl<'a> QueryContext<'a> {
    /// Creates a context for one tenant.
    pub fn new(
        tenant: i64,
        schema: &'a IndexSchema,
        registry: &'a ExtensionFieldRegistry,
        source: &'a dyn FieldNameSource,
    ) -> Self {
        Self {
            tenant,
            schema,
            registry,
            source,
            fields: OnceCell::new(),
        }
    }

    /// The tenant id.
    pub fn tenant(&self) -> i64 {
        self.tenant
    }

    /// The schema field handles.
    pub fn schema(&self) -> &IndexSchema {
        self.schema
    }

    /// Extension fields present in the tenant's index.
    pub fn extension_fields(&self) -> &[String] {
        self.fields
            .get_or_init(|| self.registry.get_fields(self.tenant, self.source))
    }

    /// Finds the indexed spelling of an extension field, ignoring case.
    pub fn resolve_extension(&self, name: &str) -> Option<&str> {
        self.extension_fields()
            .iter()
            .find(|field| field.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    /// Content plus every extension field.
    pub(crate) fn all_targets(&self) -> Vec<FieldTarget> {
        let mut targets = vec![FieldTarget::Content];
        targets.extend(
            self.extension_fields()
                .iter()
                .map(|name| FieldTarget::Extension(name.clone())),
        );
        targets
    }

    /// Extension fields only.
    fn extension_targets(&self) -> Vec<FieldTarget> {
        self.extension_fields()
            .iter()
            .map(|name| FieldTarget::Extension(name.clone()))
            .collect()
    }
}

/// One SHOULD clause per (keyword, field) pair.
pub(crate) fn term_clauses(
    schema: &IndexSchema,
    targets: &[FieldTarget],
    tokens: &[String],
) -> Vec<(Occur, Box<dyn Query>)> {
    tokens
        .iter()
        .filter(|token| !token.trim().is_empty())
        .flat_map(|token| {
            targets.iter().map(move |target| {
                let term = schema.term(target, token);
                let query: Box<dyn Query> =
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
                (Occur::Should, query)
            })
        })
        .collect()
}

/// One SHOULD phrase clause per field. A single token degrades to a term match.
pub(crate) fn phrase_clauses(
    schema: &IndexSchema,
    targets: &[FieldTarget],
    tokens: &[String],
) -> Vec<(Occur, Box<dyn Query>)> {
    if tokens.is_empty() {
        return Vec::new();
    }
    if tokens.len() == 1 {
        return term_clauses(schema, targets, tokens);
    }

    targets
        .iter()
        .map(|target| {
            let terms = tokens
                .iter()
                .map(|token| schema.term(target, token))
                .collect();
            let query: Box<dyn Query> = Box::new(PhraseQuery::new(terms));
            (Occur::Should, query)
        })
        .collect()
}

/// Matches any keyword in the content field.
///
/// Returns an empty query, which matches nothing, when no keyword is usable.
pub fn build_content_query(tokens: &[String], schema: &IndexSchema) -> BooleanQuery {
    BooleanQuery::new(term_clauses(schema, &[FieldTarget::Content], tokens))
}

/// Matches any keyword in any extension field of the tenant.
///
/// Returns an empty query without looking at the keywords when the tenant has no
/// extension fields.
pub fn build_extension_query(tokens: &[String], ctx: &QueryContext<'_>) -> BooleanQuery {
    let targets = ctx.extension_targets();
    if targets.is_empty() {
        return BooleanQuery::new(Vec::new());
    }
    BooleanQuery::new(term_clauses(ctx.schema, &targets, tokens))
}

/// Matches the ordered tokens as a phrase in content or any extension field.
///
/// Callers must pass at least one token.
pub fn build_phrase_query(tokens: &[String], ctx: &QueryContext<'_>) -> BooleanQuery {
    BooleanQuery::new(phrase_clauses(ctx.schema, &ctx.all_targets(), tokens))
}

/// Pulls every double-quoted phrase out of a query.
///
/// Returns one phrase query per usable phrase and the query text with all quoted sections
/// removed. Phrases that tokenize to nothing are skipped.
pub fn extract_phrases(query: &str, ctx: &QueryContext<'_>) -> (Vec<Box<dyn Query>>, String) {
    let mut phrases: Vec<Box<dyn Query>> = Vec::new();

    for captures in PHRASE_PATTERN.captures_iter(query) {
        let inner = captures.get(1).map_or("", |m| m.as_str());
        let tokens = tokenize(inner);
        if tokens.is_empty() {
            debug!(group_id = ctx.tenant, phrase = inner, "skipping phrase without keywords");
            continue;
        }
        phrases.push(Box::new(build_phrase_query(&tokens, ctx)));
    }

    let remaining = PHRASE_PATTERN.replace_all(query, " ");
    let remaining = remaining.split_whitespace().collect::<Vec<_>>().join(" ");
    (phrases, remaining)
}

/// Builds one clause per excluded keyword, each matching content or any extension field.
///
/// The caller attaches the clauses with `MustNot`.
pub fn build_exclusion_query(keywords: &[String], ctx: &QueryContext<'_>) -> Vec<Box<dyn Query>> {
    let targets = ctx.all_targets();
    keywords
        .iter()
        .filter(|keyword| !keyword.trim().is_empty())
        .map(|keyword| {
            let clauses = term_clauses(ctx.schema, &targets, slice::from_ref(keyword));
            Box::new(BooleanQuery::new(clauses)) as Box<dyn Query>
        })
        .collect()
}

/// Resolves a validated field qualifier to the field it should search.
pub(crate) fn field_target(spec: &FieldSpec, ctx: &QueryContext<'_>) -> FieldTarget {
    if spec.is_content() {
        return FieldTarget::Content;
    }
    let name = ctx
        .resolve_extension(&spec.name)
        .map_or_else(|| spec.name.clone(), str::to_string);
    FieldTarget::Extension(name)
}

/// Builds the query for one `field:value` qualifier.
///
/// Invalid qualifiers are rejected (and logged by [`is_valid`]). A value with several
/// keywords must match them as a phrase in that field.
pub fn build_field_query(spec: &FieldSpec, ctx: &QueryContext<'_>) -> Option<Box<dyn Query>> {
    if !is_valid(spec) {
        return None;
    }
    let target = field_target(spec, ctx);
    let tokens = tokenize(spec.value.trim_matches('"'));
    if tokens.is_empty() {
        debug!(group_id = ctx.tenant, field = %spec.name, "field value has no keywords");
        return None;
    }

    let mut clauses = phrase_clauses(ctx.schema, &[target], &tokens);
    if clauses.len() == 1 {
        return clauses.pop().map(|(_, query)| query);
    }
    Some(Box::new(BooleanQuery::new(clauses)))
}
