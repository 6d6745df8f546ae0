//! Message documents and their mapping to and from tantivy documents.

use std::collections::BTreeMap;

use chatdex_query::EXTENSION_PREFIX;
use serde::{Deserialize, Deserializer, Serialize};
use tantivy::{
    TantivyDocument,
    schema::{Field, OwnedValue, Value},
};
use tracing::{debug, warn};

use crate::{IndexError, schema::IndexSchema};

/// A chat message as exchanged with ingestion and search callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDocument {
    /// Internal surrogate key.
    pub id: i64,
    /// Tenant (chat group) id.
    pub group_id: i64,
    /// Message id, unique within the group.
    pub message_id: i64,
    /// Sender id.
    #[serde(default)]
    pub from_user_id: i64,
    /// Id of the user being replied to, 0 when not a reply.
    #[serde(default)]
    pub reply_to_user_id: i64,
    /// Id of the message being replied to, 0 when not a reply.
    #[serde(default)]
    pub reply_to_message_id: i64,
    /// ISO-8601 instant, kept verbatim.
    #[serde(default)]
    pub timestamp: String,
    /// Message text. A JSON `null` becomes the empty string.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    /// Text derived from attached media, e.g. OCR or speech transcripts.
    #[serde(default)]
    pub extensions: Vec<MessageExtension>,
}

/// One extension value attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageExtension {
    /// Extension name without the field marker, e.g. `OCR_Result`.
    pub name: String,
    /// Extension text.
    pub value: String,
}

impl MessageExtension {
    /// Creates an extension value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Deserializes an optional string, mapping `null` to `""`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Returns the indexed field name for an extension name.
///
/// Names that already start with the exact marker are kept as they are. Any other
/// spelling, `ext_` included, gets the marker, so the registry finds every extension field.
pub fn extension_field_name(name: &str) -> String {
    if name.starts_with(EXTENSION_PREFIX) {
        name.to_string()
    } else {
        format!("{EXTENSION_PREFIX}{name}")
    }
}

/// Collects extension values by field name, joining repeated names with a newline.
fn extension_map(message: &MessageDocument) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for extension in &message.extensions {
        if extension.name.trim().is_empty() {
            debug!(
                group_id = message.group_id,
                message_id = message.message_id,
                "skipping extension without a name"
            );
            continue;
        }
        map.entry(extension_field_name(extension.name.trim()))
            .and_modify(|existing| {
                existing.push('\n');
                existing.push_str(&extension.value);
            })
            .or_insert_with(|| extension.value.clone());
    }
    map
}

/// Converts a message into the tantivy document for its tenant index.
pub fn to_tantivy(
    schema: &IndexSchema,
    message: &MessageDocument,
) -> Result<TantivyDocument, IndexError> {
    let mut doc = TantivyDocument::new();

    doc.add_i64(schema.id, message.id);
    doc.add_i64(schema.group_id, message.group_id);
    doc.add_i64(schema.message_id, message.message_id);
    doc.add_i64(schema.from_user_id, message.from_user_id);
    doc.add_i64(schema.reply_to_user_id, message.reply_to_user_id);
    doc.add_i64(schema.reply_to_message_id, message.reply_to_message_id);
    doc.add_text(schema.timestamp, &message.timestamp);
    doc.add_text(schema.content, &message.content);

    let extensions = extension_map(message);
    if !extensions.is_empty() {
        let stored = serde_json::to_string(&extensions).map_err(|e| {
            IndexError::Write(format!(
                "cannot encode extensions of message {}: {e}",
                message.message_id
            ))
        })?;
        doc.add_text(schema.extensions_stored, &stored);

        for name in extensions.keys() {
            doc.add_text(schema.extension_names, name);
        }
        let object: BTreeMap<String, OwnedValue> = extensions
            .into_iter()
            .map(|(name, value)| (name, OwnedValue::Str(value)))
            .collect();
        doc.add_object(schema.extensions, object);
    }

    Ok(doc)
}

/// Reads an integer field that every indexed message carries.
fn stored_i64(doc: &TantivyDocument, field: Field) -> Option<i64> {
    doc.get_first(field).and_then(|v| v.as_i64())
}

/// Maps a stored document back to a message.
///
/// Returns `None`, with a warning, when a required field is missing.
pub fn from_tantivy(schema: &IndexSchema, doc: &TantivyDocument) -> Option<MessageDocument> {
    let (Some(id), Some(group_id), Some(message_id)) = (
        stored_i64(doc, schema.id),
        stored_i64(doc, schema.group_id),
        stored_i64(doc, schema.message_id),
    ) else {
        warn!("skipping stored document without id, group_id or message_id");
        return None;
    };

    let text = |field: Field| {
        doc.get_first(field)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    let extensions = doc
        .get_first(schema.extensions_stored)
        .and_then(|v| v.as_str())
        .map(|json| {
            serde_json::from_str::<BTreeMap<String, String>>(json).unwrap_or_else(|e| {
                warn!(group_id, message_id, error = %e, "ignoring unreadable stored extensions");
                BTreeMap::new()
            })
        })
        .unwrap_or_default()
        .into_iter()
        .map(|(field, value)| {
            let name = field
                .strip_prefix(EXTENSION_PREFIX)
                .map(str::to_string)
                .unwrap_or(field);
            MessageExtension { name, value }
        })
        .collect();

    Some(MessageDocument {
        id,
        group_id,
        message_id,
        from_user_id: stored_i64(doc, schema.from_user_id).unwrap_or_default(),
        reply_to_user_id: stored_i64(doc, schema.reply_to_user_id).unwrap_or_default(),
        reply_to_message_id: stored_i64(doc, schema.reply_to_message_id).unwrap_or_default(),
        timestamp: text(schema.timestamp),
        content: text(schema.content),
        extensions,
    })
}
