//! Full-text search over chat messages, one tantivy index per chat group.
//!
//! This crate provides:
//! - Segmentation of mixed Chinese and Latin text ([`tokenize`])
//! - The message schema and its mapping to tantivy documents
//! - Discovery and caching of per-tenant extension fields ([`ExtensionFieldRegistry`])
//! - Query builders and the simple/syntax query compilers
//! - Index lifecycle and search ([`IndexManager`], [`SearchService`])
//! - Display excerpts around the best match ([`find_best_snippet`])
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chatdex_index::{ExtensionFieldRegistry, IndexManager, MessageDocument};
//!
//! let manager = IndexManager::new(
//!     "./index",
//!     50_000_000,
//!     Arc::new(ExtensionFieldRegistry::default()),
//! );
//!
//! let message = MessageDocument {
//!     id: 1,
//!     group_id: 100,
//!     message_id: 1,
//!     from_user_id: 42,
//!     reply_to_user_id: 0,
//!     reply_to_message_id: 0,
//!     timestamp: "2024-05-01T08:30:00Z".to_string(),
//!     content: "这是一条测试消息".to_string(),
//!     extensions: Vec::new(),
//! };
//! manager.write(&message).unwrap();
//!
//! let page = manager.search("测试", 100, 0, 20).unwrap();
//! assert_eq!(page.total, 1);
//! ```

#![warn(missing_docs)]

mod builders;
mod compile;
mod document;
mod error;
mod manager;
mod registry;
mod schema;
mod service;
mod snippet;
mod tokenizer;

pub use builders::{
    QueryContext, build_content_query, build_exclusion_query, build_extension_query,
    build_field_query, build_phrase_query, extract_phrases,
};
pub use compile::{compile_simple, compile_syntax};
pub use document::{MessageDocument, MessageExtension, extension_field_name};
pub use error::{IndexError, TokenizeError};
pub use manager::{BatchReport, IndexManager, SearchPage, TenantReader};
pub use registry::{ExtensionFieldRegistry, FieldNameSource};
pub use schema::{FieldTarget, IndexSchema};
pub use service::{SearchMode, SearchRequest, SearchScope, SearchService};
pub use snippet::{SnippetError, find_best_snippet};
pub use tokenizer::{
    CHAT_TOKENIZER, OffsetToken, build_analyzer, keywords, tokenize, try_tokenize,
    try_tokenize_with_offsets,
};
