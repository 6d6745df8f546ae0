//! Compilation of user-typed search strings into tantivy queries.
//!
//! Two modes exist:
//! - **Simple**: the whole string is segmented into keywords, any of which may match content
//!   or an extension field.
//! - **Syntax**: the string is parsed as a boolean query (`AND`, `OR`, `NOT`, `-`, groups,
//!   quoted phrases and `field:value` qualifiers). Strings that do not parse fall back to a
//!   flat reading of the same features.
//!
//! In both modes a blank string matches every document, while a non-blank string that
//! yields no keywords matches nothing.

use chatdex_query::{FieldSpec, QueryExpr, extract, is_valid, parse, resolve_alias};
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query};
use tracing::{debug, warn};

use crate::{
    builders::{
        QueryContext, build_content_query, build_exclusion_query, build_extension_query,
        build_field_query, extract_phrases, field_target, phrase_clauses, term_clauses,
    },
    schema::FieldTarget,
    tokenizer::{keywords, tokenize},
};

/// A query that matches nothing.
fn match_nothing() -> Box<dyn Query> {
    Box::new(BooleanQuery::new(Vec::new()))
}

/// Compiles a simple-mode query.
pub fn compile_simple(query: &str, ctx: &QueryContext<'_>) -> Box<dyn Query> {
    if query.trim().is_empty() {
        return Box::new(AllQuery);
    }

    let tokens = keywords(query);
    if tokens.is_empty() {
        debug!(group_id = ctx.tenant(), query, "query has no searchable keywords");
        return match_nothing();
    }

    let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(
        Occur::Should,
        Box::new(build_content_query(&tokens, ctx.schema())),
    )];
    let extensions = build_extension_query(&tokens, ctx);
    if !extensions.clauses().is_empty() {
        clauses.push((Occur::Should, Box::new(extensions)));
    }
    Box::new(BooleanQuery::new(clauses))
}

/// Compiles a syntax-mode query.
///
/// Parse errors never reach the caller: they are logged and the query is read flat.
pub fn compile_syntax(query: &str, ctx: &QueryContext<'_>) -> Box<dyn Query> {
    if query.trim().is_empty() {
        return Box::new(AllQuery);
    }

    match parse(query) {
        Ok(Some(expr)) => {
            debug!(group_id = ctx.tenant(), "compiling query:\n{expr}");
            SyntaxCompiler { ctx }
                .compile(&expr, &Scope::All)
                .unwrap_or_else(|| {
                    debug!(group_id = ctx.tenant(), query, "query compiled to nothing");
                    match_nothing()
                })
        }
        Ok(None) => match_nothing(),
        Err(e) => {
            warn!(group_id = ctx.tenant(), error = %e, "query syntax error, searching flat");
            compile_flat(query, ctx)
        }
    }
}

/// Fields a sub-expression may match.
#[derive(Debug, Clone)]
enum Scope {
    /// Content and every extension field.
    All,
    /// A single field chosen by a qualifier.
    Only(FieldTarget),
}

/// Walks a parsed expression and builds the boolean query for one tenant.
struct SyntaxCompiler<'c, 'a> {
    /// Tenant being searched.
    ctx: &'c QueryContext<'a>,
}

impl SyntaxCompiler<'_, '_> {
    /// Compiles an expression. Returns `None` when it contributes nothing.
    fn compile(&self, expr: &QueryExpr, scope: &Scope) -> Option<Box<dyn Query>> {
        match expr {
            QueryExpr::Term(text) => self.compile_term(text, scope),
            QueryExpr::Phrase(text) => self.compile_phrase(text, scope),
            QueryExpr::Not(inner) => {
                let excluded = self.compile(inner, scope)?;
                Some(Box::new(BooleanQuery::new(vec![
                    (Occur::Must, Box::new(AllQuery) as Box<dyn Query>),
                    (Occur::MustNot, excluded),
                ])))
            }
            QueryExpr::And(exprs) => self.compile_and(exprs, scope),
            QueryExpr::Or(exprs) => self.compile_or(exprs, scope),
            QueryExpr::Field { name, expr } => self.compile_field(name, expr),
        }
    }

    /// Targets covered by a scope.
    fn targets(&self, scope: &Scope) -> Vec<FieldTarget> {
        match scope {
            Scope::All => self.ctx.all_targets(),
            Scope::Only(target) => vec![target.clone()],
        }
    }

    /// Any keyword of the term, in any field of the scope.
    fn compile_term(&self, text: &str, scope: &Scope) -> Option<Box<dyn Query>> {
        let tokens = keywords(text);
        if tokens.is_empty() {
            return None;
        }
        let clauses = term_clauses(self.ctx.schema(), &self.targets(scope), &tokens);
        Some(Box::new(BooleanQuery::new(clauses)))
    }

    /// The phrase in any field of the scope.
    fn compile_phrase(&self, text: &str, scope: &Scope) -> Option<Box<dyn Query>> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            debug!(group_id = self.ctx.tenant(), phrase = text, "skipping phrase without keywords");
            return None;
        }
        let clauses = phrase_clauses(self.ctx.schema(), &self.targets(scope), &tokens);
        Some(Box::new(BooleanQuery::new(clauses)))
    }

    /// Positives become MUST and negations MUST_NOT. Negations alone exclude from everything.
    fn compile_and(&self, exprs: &[QueryExpr], scope: &Scope) -> Option<Box<dyn Query>> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        let mut negative: Vec<Box<dyn Query>> = Vec::new();

        for expr in exprs {
            match expr {
                QueryExpr::Not(inner) => negative.extend(self.compile(inner, scope)),
                other => {
                    if let Some(query) = self.compile(other, scope) {
                        clauses.push((Occur::Must, query));
                    }
                }
            }
        }

        combine(clauses, negative)
    }

    /// Alternatives become SHOULD. Negated alternatives exclude from the whole group, so
    /// `engine -basics` finds engine messages that do not mention basics.
    fn compile_or(&self, exprs: &[QueryExpr], scope: &Scope) -> Option<Box<dyn Query>> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        let mut negative: Vec<Box<dyn Query>> = Vec::new();

        for expr in exprs {
            match expr {
                QueryExpr::Not(inner) => negative.extend(self.compile(inner, scope)),
                other => {
                    if let Some(query) = self.compile(other, scope) {
                        clauses.push((Occur::Should, query));
                    }
                }
            }
        }

        combine(clauses, negative)
    }

    /// Restricts the inner expression to one field. Unknown fields contribute nothing.
    fn compile_field(&self, name: &str, expr: &QueryExpr) -> Option<Box<dyn Query>> {
        let spec = FieldSpec::new(resolve_alias(name), expr.to_query_string());
        if !is_valid(&spec) {
            return None;
        }
        let target = field_target(&spec, self.ctx);
        self.compile(expr, &Scope::Only(target))
    }
}

/// Attaches exclusions to a group of positive clauses.
///
/// Without positives the exclusions apply to every document.
fn combine(
    mut clauses: Vec<(Occur, Box<dyn Query>)>,
    negative: Vec<Box<dyn Query>>,
) -> Option<Box<dyn Query>> {
    if clauses.is_empty() && negative.is_empty() {
        return None;
    }
    if clauses.is_empty() {
        clauses.push((Occur::Must, Box::new(AllQuery)));
    }
    clauses.extend(negative.into_iter().map(|query| (Occur::MustNot, query)));
    Some(Box::new(BooleanQuery::new(clauses)))
}

/// Words the flat reading drops rather than searches for.
fn is_operator(word: &str) -> bool {
    matches!(word, "AND" | "OR" | "NOT")
}

/// Reads a query without its grammar.
///
/// Quoted phrases and valid field qualifiers must match, `-word` excludes, and every other
/// keyword may match content or an extension field.
fn compile_flat(query: &str, ctx: &QueryContext<'_>) -> Box<dyn Query> {
    let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

    let (phrases, rest) = extract_phrases(query, ctx);
    clauses.extend(phrases.into_iter().map(|query| (Occur::Must, query)));

    let (specs, rest) = extract(&rest);
    clauses.extend(
        specs
            .iter()
            .filter_map(|spec| build_field_query(spec, ctx))
            .map(|query| (Occur::Must, query)),
    );

    let mut included = Vec::new();
    let mut excluded = Vec::new();
    for word in rest.split_whitespace().filter(|word| !is_operator(word)) {
        match word.strip_prefix('-') {
            Some(negated) if !negated.is_empty() => excluded.push(negated),
            _ => included.push(word),
        }
    }

    let tokens = keywords(&included.join(" "));
    if !tokens.is_empty() {
        let mut alternatives: Vec<(Occur, Box<dyn Query>)> = vec![(
            Occur::Should,
            Box::new(build_content_query(&tokens, ctx.schema())),
        )];
        let extensions = build_extension_query(&tokens, ctx);
        if !extensions.clauses().is_empty() {
            alternatives.push((Occur::Should, Box::new(extensions)));
        }
        clauses.push((Occur::Should, Box::new(BooleanQuery::new(alternatives))));
    }

    let exclusions = build_exclusion_query(&keywords(&excluded.join(" ")), ctx);
    if clauses.is_empty() && exclusions.is_empty() {
        debug!(group_id = ctx.tenant(), query, "query has no searchable keywords");
        return match_nothing();
    }
    if clauses.is_empty() {
        clauses.push((Occur::Must, Box::new(AllQuery)));
    }
    clauses.extend(exclusions.into_iter().map(|query| (Occur::MustNot, query)));
    Box::new(BooleanQuery::new(clauses))
}
