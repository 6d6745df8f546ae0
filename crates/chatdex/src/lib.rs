//! chatdex: full-text search over chat messages
//!
//! Every chat group (tenant) gets its own index. Messages are segmented for mixed Chinese
//! and Latin text, searched with a keyword or a boolean query language, and displayed with
//! an excerpt around the best match.
//!
//! The binary exposes indexing, deletion, search and snippet extraction as subcommands, and
//! reads its settings from layered `.chatdex.toml` files.

#![warn(missing_docs)]

pub mod cli;
