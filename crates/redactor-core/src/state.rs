//! UI-agnostic editor state types
//!
//! This module contains the data structures shared between the session, the
//! apply/undo engine and whatever host renders them (terminal, desktop, web).
//! None of them depend on a specific UI framework.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// An editable field of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Abstract,
    Body,
    Tags,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Abstract => "abstract",
            Field::Body => "body",
            Field::Tags => "tags",
        }
    }

    /// Human-readable field name shown next to a change
    pub fn label(&self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::Abstract => "Abstract",
            Field::Body => "Body",
            Field::Tags => "Tags",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a change mutates its field. `Append` is only produced for the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Replace,
    Append,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Replace => "replace",
            ChangeKind::Append => "append",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ChangeKind::Replace => "Replace",
            ChangeKind::Append => "Append",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value carried by a change or recorded in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Tags(Vec<String>),
}

/// One proposed edit to a named field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub id: String,
    pub field: Field,
    pub kind: ChangeKind,
    pub label: String,
    pub value: FieldValue,
    pub preview: String,
}

/// Labeled sections found in an assistant reply (`#TITLE`, `#ABSTRACT`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sections {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub body: Option<String>,
    pub tags: Vec<String>,
}

impl Sections {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.abstract_text.is_none()
            && self.body.is_none()
            && self.tags.is_empty()
    }
}

/// Snapshot of the host editor's current field values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValues {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FieldValues {
    /// Current value of `field`, tags copied
    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Title => FieldValue::Text(self.title.clone()),
            Field::Abstract => FieldValue::Text(self.abstract_text.clone()),
            Field::Body => FieldValue::Text(self.body.clone()),
            Field::Tags => FieldValue::Tags(self.tags.clone()),
        }
    }
}

/// Usage counters reported by the hosted assist endpoint. Display only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    pub used: f64,
    pub limit: f64,
}

/// A chat message in the editor conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Sections>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<Change>,
    /// Clarifying questions the assistant asked via `CONFIRM`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub confirmations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role: ChatRole::User,
            text: text.into(),
            sections: None,
            changes: Vec::new(),
            confirmations: Vec::new(),
            confidence: None,
        }
    }

    pub fn change(&self, change_id: &str) -> Option<&Change> {
        self.changes.iter().find(|c| c.id == change_id)
    }
}

pub(crate) fn new_message_id() -> String {
    format!("m-{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_values_get_copies_tags() {
        let values = FieldValues {
            tags: vec!["rust".to_string()],
            ..FieldValues::default()
        };
        let mut copy = values.get(Field::Tags);
        if let FieldValue::Tags(tags) = &mut copy {
            tags.push("async".to_string());
        }
        assert_eq!(values.tags, vec!["rust".to_string()]);
    }

    #[test]
    fn test_field_values_use_abstract_key() {
        let values: FieldValues =
            serde_json::from_str(r#"{"title":"T","abstract":"A"}"#).unwrap();
        assert_eq!(values.abstract_text, "A");
        assert!(values.body.is_empty());
        assert!(values.tags.is_empty());
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = ChatMessage::user("one");
        let b = ChatMessage::user("one");
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("m-"));
    }
}
