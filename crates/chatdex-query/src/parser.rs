//! Query parser.
//!
//! Parses a token stream into a query AST using recursive descent.
//!
//! # Grammar
//!
//! ```text
//! query      → or_expr
//! or_expr    → and_expr (("OR")? and_expr)*
//! and_expr   → unary ("AND" unary)*
//! unary      → ("NOT" | "-") unary | primary
//! primary    → TERM | PHRASE | field_expr | "(" or_expr ")"
//! field_expr → FIELD_PREFIX (TERM | PHRASE | "(" or_expr ")")
//! ```
//!
//! # Precedence (highest to lowest)
//!
//! 1. Grouping: `(...)`
//! 2. Field prefix: `field:`
//! 3. Negation: `NOT` / `-`
//! 4. AND (explicit keyword)
//! 5. OR (explicit keyword, or implicit between adjacent expressions)

use std::mem;

use crate::{
    ast::QueryExpr,
    error::{ParseError, QueryError},
    lexer::{Token, tokenize},
};

/// Recursive descent parser for query expressions.
struct Parser {
    /// Token stream to parse.
    tokens: Vec<Token>,
    /// Current position in token stream.
    position: usize,
}

impl Parser {
    /// Creates a new parser from a token stream.
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parses the token stream into a query expression.
    fn parse(mut self) -> Result<Option<QueryExpr>, ParseError> {
        if self.tokens.is_empty() {
            return Ok(None);
        }

        let expr = self.parse_or_expr()?;

        if let Some(token) = self.peek() {
            let message = match token {
                Token::RParen => "unexpected closing parenthesis".to_string(),
                other => format!("unexpected token: {other:?}"),
            };
            return Err(ParseError::new(message, Some(self.position)));
        }

        Ok(Some(expr))
    }

    /// Parses: or_expr → and_expr (("OR")? and_expr)*
    fn parse_or_expr(&mut self) -> Result<QueryExpr, ParseError> {
        let mut exprs = vec![self.parse_and_expr()?];

        loop {
            if self.check(&Token::Or) {
                self.advance(); // consume OR
                if !self.can_start_unary() {
                    return Err(ParseError::new(
                        "expected expression after OR",
                        Some(self.position),
                    ));
                }
            } else if !self.can_start_unary() {
                break;
            }
            exprs.push(self.parse_and_expr()?);
        }

        Ok(QueryExpr::or(exprs))
    }

    /// Parses: and_expr → unary ("AND" unary)*
    fn parse_and_expr(&mut self) -> Result<QueryExpr, ParseError> {
        let mut exprs = vec![self.parse_unary()?];

        while self.check(&Token::And) {
            self.advance(); // consume AND
            if !self.can_start_unary() {
                return Err(ParseError::new(
                    "expected expression after AND",
                    Some(self.position),
                ));
            }
            exprs.push(self.parse_unary()?);
        }

        Ok(QueryExpr::and(exprs))
    }

    /// Checks if the current token can start a unary expression.
    fn can_start_unary(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Term(_)
                    | Token::Phrase(_)
                    | Token::Not
                    | Token::LParen
                    | Token::FieldPrefix(_)
            )
        )
    }

    /// Parses: unary → ("NOT" | "-") unary | primary
    fn parse_unary(&mut self) -> Result<QueryExpr, ParseError> {
        if self.check(&Token::Not) {
            self.advance(); // consume NOT
            if !self.can_start_unary() {
                return Err(ParseError::new(
                    "expected expression after NOT",
                    Some(self.position),
                ));
            }
            let expr = self.parse_unary()?;
            return Ok(QueryExpr::not(expr));
        }

        self.parse_primary()
    }

    /// Parses: primary → TERM | PHRASE | field_expr | "(" or_expr ")"
    fn parse_primary(&mut self) -> Result<QueryExpr, ParseError> {
        match self.peek().cloned() {
            Some(Token::Term(_) | Token::Phrase(_)) => Ok(self.parse_term_or_phrase()),

            Some(Token::FieldPrefix(name)) => {
                self.advance();
                self.parse_field_expr(name)
            }

            Some(Token::LParen) => self.parse_group("expected closing parenthesis"),

            Some(Token::RParen) => Err(ParseError::new(
                "unexpected closing parenthesis",
                Some(self.position),
            )),

            Some(Token::Or) => Err(ParseError::new(
                "unexpected OR (needs expression before it)",
                Some(self.position),
            )),

            Some(Token::And) => Err(ParseError::new(
                "unexpected AND (needs expression before it)",
                Some(self.position),
            )),

            Some(Token::Not) => Err(ParseError::new("unexpected NOT", Some(self.position))),

            None => Err(ParseError::new("unexpected end of query", None)),
        }
    }

    /// Parses the expression after a field prefix.
    fn parse_field_expr(&mut self, name: String) -> Result<QueryExpr, ParseError> {
        let expr = match self.peek() {
            Some(Token::Term(_) | Token::Phrase(_)) => self.parse_term_or_phrase(),
            Some(Token::LParen) => {
                self.parse_group("expected closing parenthesis after field expression")?
            }
            _ => {
                return Err(ParseError::new(
                    format!("expected term, phrase, or group after '{name}:'"),
                    Some(self.position),
                ));
            }
        };

        Ok(QueryExpr::Field {
            name,
            expr: Box::new(expr),
        })
    }

    /// Parses a TERM or PHRASE token into a QueryExpr, consuming the token.
    fn parse_term_or_phrase(&mut self) -> QueryExpr {
        let expr = match self.peek() {
            Some(Token::Term(text)) => QueryExpr::Term(text.clone()),
            Some(Token::Phrase(text)) => QueryExpr::Phrase(text.clone()),
            _ => unreachable!("parse_term_or_phrase called on non-term/phrase token"),
        };
        self.advance();
        expr
    }

    /// Parses a parenthesized group, consuming the surrounding parentheses.
    fn parse_group(&mut self, missing_rparen_msg: &str) -> Result<QueryExpr, ParseError> {
        self.advance(); // consume (
        if self.check(&Token::RParen) {
            return Err(ParseError::new("empty group", Some(self.position)));
        }
        let inner = self.parse_or_expr()?;

        if !self.check(&Token::RParen) {
            return Err(ParseError::new(missing_rparen_msg, Some(self.position)));
        }
        self.advance(); // consume )

        Ok(inner)
    }

    /// Returns the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    /// Checks if the current token matches the given token.
    fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| mem::discriminant(t) == mem::discriminant(token))
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }
}

/// Parses a query string into an AST.
///
/// Returns `Ok(None)` for blank queries, `Ok(Some(expr))` for valid queries,
/// or `Err(QueryError)` for invalid syntax.
pub fn parse(input: &str) -> Result<Option<QueryExpr>, QueryError> {
    let tokens = tokenize(input)?;
    Parser::new(tokens)
        .parse()
        .map_err(|e| QueryError::from(e).with_query(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(s: &str) -> QueryExpr {
        QueryExpr::Term(s.into())
    }

    fn phrase(s: &str) -> QueryExpr {
        QueryExpr::Phrase(s.into())
    }

    fn not(e: QueryExpr) -> QueryExpr {
        QueryExpr::not(e)
    }

    fn and(exprs: Vec<QueryExpr>) -> QueryExpr {
        QueryExpr::and(exprs)
    }

    fn or(exprs: Vec<QueryExpr>) -> QueryExpr {
        QueryExpr::or(exprs)
    }

    fn field(name: &str, e: QueryExpr) -> QueryExpr {
        QueryExpr::Field {
            name: name.into(),
            expr: Box::new(e),
        }
    }

    #[test]
    fn empty_query() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn single_term() {
        assert_eq!(parse("lucene").unwrap(), Some(term("lucene")));
    }

    #[test]
    fn adjacency_is_or() {
        assert_eq!(
            parse("lucene search").unwrap(),
            Some(or(vec![term("lucene"), term("search")]))
        );
    }

    #[test]
    fn explicit_and() {
        assert_eq!(
            parse("Lucene AND search").unwrap(),
            Some(and(vec![term("Lucene"), term("search")]))
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert_eq!(
            parse("a OR b AND c").unwrap(),
            Some(or(vec![term("a"), and(vec![term("b"), term("c")])]))
        );
        assert_eq!(
            parse("a AND b c").unwrap(),
            Some(or(vec![and(vec![term("a"), term("b")]), term("c")]))
        );
    }

    #[test]
    fn not_binds_tighter_than_and() {
        assert_eq!(
            parse("a AND NOT b").unwrap(),
            Some(and(vec![term("a"), not(term("b"))]))
        );
        assert_eq!(
            parse("NOT a AND b").unwrap(),
            Some(and(vec![not(term("a")), term("b")]))
        );
    }

    #[test]
    fn dash_is_not() {
        assert_eq!(
            parse("lucene -solr").unwrap(),
            Some(or(vec![term("lucene"), not(term("solr"))]))
        );
    }

    #[test]
    fn double_negation() {
        assert_eq!(parse("NOT NOT a").unwrap(), Some(not(not(term("a")))));
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_eq!(
            parse("(a OR b) AND c").unwrap(),
            Some(and(vec![or(vec![term("a"), term("b")]), term("c")]))
        );
    }

    #[test]
    fn nested_groups() {
        assert_eq!(
            parse("((a))").unwrap(),
            Some(term("a"))
        );
    }

    #[test]
    fn phrase_with_operators() {
        assert_eq!(
            parse("\"search engine\" AND lucene").unwrap(),
            Some(and(vec![phrase("search engine"), term("lucene")]))
        );
    }

    #[test]
    fn field_term() {
        assert_eq!(
            parse("ocr:发票").unwrap(),
            Some(field("ocr", term("发票")))
        );
    }

    #[test]
    fn field_phrase() {
        assert_eq!(
            parse("content:\"测试 消息\"").unwrap(),
            Some(field("content", phrase("测试 消息")))
        );
    }

    #[test]
    fn field_group() {
        assert_eq!(
            parse("asr:(a OR b) AND c").unwrap(),
            Some(and(vec![
                field("asr", or(vec![term("a"), term("b")])),
                term("c")
            ]))
        );
    }

    #[test]
    fn negated_field() {
        assert_eq!(
            parse("a -ocr:spam").unwrap(),
            Some(or(vec![term("a"), not(field("ocr", term("spam")))]))
        );
    }

    #[test]
    fn unclosed_paren_error() {
        let err = parse("(a OR b").unwrap_err();
        assert!(err.message().contains("closing parenthesis"));
        assert_eq!(err.query.as_deref(), Some("(a OR b"));
    }

    #[test]
    fn stray_closing_paren_error() {
        let err = parse("a)").unwrap_err();
        assert!(err.message().contains("unexpected closing parenthesis"));
    }

    #[test]
    fn leading_operator_errors() {
        assert!(parse("OR a").unwrap_err().message().contains("unexpected OR"));
        assert!(parse("AND a").unwrap_err().message().contains("unexpected AND"));
    }

    #[test]
    fn trailing_operator_errors() {
        assert!(parse("a OR").unwrap_err().message().contains("after OR"));
        assert!(parse("a AND").unwrap_err().message().contains("after AND"));
        assert!(parse("a NOT").unwrap_err().message().contains("after NOT"));
    }

    #[test]
    fn empty_group_error() {
        assert!(parse("a ()").unwrap_err().message().contains("empty group"));
    }

    #[test]
    fn field_without_value_error() {
        let err = parse("ocr:)").unwrap_err();
        assert!(err.message().contains("after 'ocr:'"));
    }

    #[test]
    fn unclosed_quote_is_lex_error() {
        let err = parse("\"abc").unwrap_err();
        assert!(matches!(err.kind, crate::QueryErrorKind::Lex { .. }));
    }
}
