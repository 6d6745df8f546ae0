//! Index schema definition for tenant message indexes.
//!
//! Every tenant index shares one schema:
//! - `id`, `from_user_id`, `reply_to_user_id`, `reply_to_message_id`: stored integers
//! - `group_id`: tenant id (indexed, stored)
//! - `message_id`: natural key within the tenant (indexed, stored, fast); the sort key for
//!   result ordering and the delete key
//! - `timestamp`: stored verbatim, not searchable
//! - `content`: message text (segmented, positions, stored)
//! - `extensions`: JSON object keyed by extension field name, segmented with positions
//! - `extension_names`: raw extension field names, one term per name, for discovery
//! - `extensions_stored`: stored JSON of the extension values for reverse mapping

use tantivy::{
    Term,
    schema::{
        FAST, Field, INDEXED, IndexRecordOption, JsonObjectOptions, STORED, STRING, Schema,
        TextFieldIndexing, TextOptions,
    },
};

use crate::tokenizer::CHAT_TOKENIZER;

/// A searchable location: the content field or one extension field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    /// The primary message text.
    Content,
    /// An extension field by its full indexed name, e.g. `Ext_OCR_Result`.
    Extension(String),
}

/// Handles to all fields in the index schema.
#[derive(Debug, Clone)]
pub struct IndexSchema {
    /// The underlying Tantivy schema.
    schema: Schema,
    /// Internal surrogate key.
    pub id: Field,
    /// Tenant (chat group) id.
    pub group_id: Field,
    /// Message id within the tenant.
    pub message_id: Field,
    /// Sender id.
    pub from_user_id: Field,
    /// Id of the user being replied to.
    pub reply_to_user_id: Field,
    /// Id of the message being replied to.
    pub reply_to_message_id: Field,
    /// ISO-8601 timestamp, stored as given.
    pub timestamp: Field,
    /// Message text.
    pub content: Field,
    /// Extension field values keyed by field name.
    pub extensions: Field,
    /// Extension field names present on the document.
    pub extension_names: Field,
    /// Stored copy of the extension values.
    pub extensions_stored: Field,
}

impl IndexSchema {
    /// Creates a new index schema with all fields configured.
    pub fn new() -> Self {
        let mut builder = Schema::builder();

        let id = builder.add_i64_field("id", STORED);
        let group_id = builder.add_i64_field("group_id", INDEXED | STORED);
        let message_id = builder.add_i64_field("message_id", INDEXED | STORED | FAST);
        let from_user_id = builder.add_i64_field("from_user_id", STORED);
        let reply_to_user_id = builder.add_i64_field("reply_to_user_id", STORED);
        let reply_to_message_id = builder.add_i64_field("reply_to_message_id", STORED);
        let timestamp = builder.add_text_field("timestamp", STORED);

        let text_indexing = TextFieldIndexing::default()
            .set_tokenizer(CHAT_TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);

        let content = builder.add_text_field(
            "content",
            TextOptions::default()
                .set_indexing_options(text_indexing.clone())
                .set_stored(),
        );

        // Indexed only; values come back through extensions_stored
        let extensions = builder.add_json_field(
            "extensions",
            JsonObjectOptions::default().set_indexing_options(text_indexing),
        );
        let extension_names = builder.add_text_field("extension_names", STRING);
        let extensions_stored = builder.add_text_field("extensions_stored", STORED);

        Self {
            schema: builder.build(),
            id,
            group_id,
            message_id,
            from_user_id,
            reply_to_user_id,
            reply_to_message_id,
            timestamp,
            content,
            extensions,
            extension_names,
            extensions_stored,
        }
    }

    /// Returns a reference to the underlying Tantivy schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Builds the term for an already analyzed token in the given field.
    pub fn term(&self, target: &FieldTarget, token: &str) -> Term {
        match target {
            FieldTarget::Content => Term::from_field_text(self.content, token),
            FieldTarget::Extension(name) => {
                let mut term = Term::from_field_json_path(self.extensions, name, false);
                term.append_type_and_str(token);
                term
            }
        }
    }

    /// Builds the delete/lookup term for a message id.
    pub fn message_term(&self, message_id: i64) -> Term {
        Term::from_field_i64(self.message_id, message_id)
    }
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self::new()
    }
}
