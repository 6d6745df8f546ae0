//! Query abstract syntax tree.
//!
//! Represents parsed syntax-mode queries before they are compiled against a tenant index.

use std::fmt;

/// A parsed query expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryExpr {
    /// Free text. It may expand to several keywords once segmented.
    Term(String),

    /// A quoted phrase, holding the raw text between the quotes.
    Phrase(String),

    /// Negation: results must NOT match this expression.
    Not(Box<Self>),

    /// Conjunction: all sub-expressions must match.
    And(Vec<Self>),

    /// Disjunction: at least one sub-expression must match.
    Or(Vec<Self>),

    /// Field-qualified query, e.g. `ocr:invoice`.
    Field {
        /// Field name as typed, before alias resolution.
        name: String,
        /// Expression to match within that field.
        expr: Box<Self>,
    },
}

impl QueryExpr {
    /// Creates an And expression, flattening nested Ands.
    pub fn and(exprs: Vec<Self>) -> Self {
        let mut flattened: Vec<Self> = exprs
            .into_iter()
            .flat_map(|e| match e {
                Self::And(inner) => inner,
                other => vec![other],
            })
            .collect();

        if flattened.len() == 1 {
            return flattened.remove(0);
        }
        Self::And(flattened)
    }

    /// Creates an Or expression, flattening nested Ors.
    pub fn or(exprs: Vec<Self>) -> Self {
        let mut flattened: Vec<Self> = exprs
            .into_iter()
            .flat_map(|e| match e {
                Self::Or(inner) => inner,
                other => vec![other],
            })
            .collect();

        if flattened.len() == 1 {
            return flattened.remove(0);
        }
        Self::Or(flattened)
    }

    /// Creates a negated expression.
    pub fn not(expr: Self) -> Self {
        Self::Not(Box::new(expr))
    }

    /// Returns true if this node is a negation.
    pub fn is_negated(&self) -> bool {
        matches!(self, Self::Not(_))
    }

    /// Formats the expression as a tree structure with the given indentation level.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let prefix = "  ".repeat(indent);
        match self {
            Self::Term(s) => writeln!(f, "{prefix}Term({s:?})"),
            Self::Phrase(text) => writeln!(f, "{prefix}Phrase({text:?})"),
            Self::Not(inner) => {
                writeln!(f, "{prefix}Not")?;
                inner.fmt_tree(f, indent + 1)
            }
            Self::And(exprs) => {
                writeln!(f, "{prefix}And")?;
                for expr in exprs {
                    expr.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
            Self::Or(exprs) => {
                writeln!(f, "{prefix}Or")?;
                for expr in exprs {
                    expr.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
            Self::Field { name, expr } => {
                writeln!(f, "{prefix}Field({name:?})")?;
                expr.fmt_tree(f, indent + 1)
            }
        }
    }

    /// Formats the expression back into explicit query syntax.
    ///
    /// Every operator is spelled out, so `a b` renders as `(a OR b)`.
    pub fn to_query_string(&self) -> String {
        match self {
            Self::Term(s) => s.clone(),
            Self::Phrase(text) => format!("\"{text}\""),
            Self::Not(inner) => format!("NOT {}", inner.to_query_string()),
            Self::And(exprs) => Self::join(exprs, " AND "),
            Self::Or(exprs) => Self::join(exprs, " OR "),
            Self::Field { name, expr } => format!("{name}:{}", expr.to_query_string()),
        }
    }

    /// Joins sub-expressions with an operator, parenthesizing the group.
    fn join(exprs: &[Self], op: &str) -> String {
        let parts: Vec<String> = exprs.iter().map(Self::to_query_string).collect();
        format!("({})", parts.join(op))
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}
