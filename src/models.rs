//! Core data models shared by the retrieval and chat pipeline.
//!
//! These types represent the club documents held in the vector store and the
//! chat messages posted by the frontend.

use serde::{Deserialize, Serialize};

/// Metadata attached to every loaded [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// The `title` field of the source entry.
    pub title: String,
}

/// A club document loaded from a static JSON file at startup.
///
/// Immutable once loaded; lives for the whole process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// The source entry as compact JSON text, with null characters removed.
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: DocumentMetadata {
                title: title.into(),
            },
        }
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }
}

/// One message of the chat history posted to `POST /api/v1/llm`.
///
/// Only `content` is consulted. Both fields are left as raw JSON values so
/// an odd `role` never rejects a message and a non-string `content` can be
/// reported precisely instead of failing deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: Option<serde_json::Value>,
    pub content: serde_json::Value,
}
