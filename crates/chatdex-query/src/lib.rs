//! Query syntax for chatdex search.
//!
//! This crate turns user-typed search strings into structures the index can compile:
//!
//! - **Terms**: `lucene` - free text, tokenized later by the index analyzer
//! - **Phrases**: `"search engine"` - contiguous, ordered matches
//! - **AND**: `lucene AND search` - both sides must match
//! - **OR**: `lucene OR solr`, or plain adjacency `lucene solr` - either side
//! - **NOT**: `NOT spam` or `-spam` - excluded matches
//! - **Grouping**: `(a OR b) AND c` - precedence control
//! - **Fields**: `ocr:invoice` - search one field, with aliases resolved
//!
//! Operators are recognized only in upper case; `and`, `or` and `not` are ordinary words.
//!
//! # Example
//!
//! ```
//! use chatdex_query::{FieldSpec, extract, parse};
//!
//! let expr = parse("ocr:invoice (lucene OR solr) AND NOT spam").unwrap();
//! assert!(expr.is_some());
//!
//! let (specs, rest) = extract("ocr:invoice paid");
//! assert_eq!(specs, vec![FieldSpec::new("Ext_OCR_Result", "invoice")]);
//! assert_eq!(rest, "paid");
//! ```

#![warn(missing_docs)]

mod ast;
mod error;
mod field_spec;
mod lexer;
mod parser;

pub use ast::QueryExpr;
pub use error::{LexError, ParseError, QueryError, QueryErrorKind};
pub use field_spec::{
    CONTENT_FIELD, EXTENSION_PREFIX, FieldSpec, extract, is_valid, parse_all, parse_one,
    resolve_alias,
};
pub use lexer::{Token, tokenize};
pub use parser::parse;
