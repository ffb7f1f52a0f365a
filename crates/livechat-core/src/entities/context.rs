//! Conversation context - what a session is currently talking about

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of business object a session can be focused on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    Document,
    Quote,
    Product,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Quote => write!(f, "quote"),
            Self::Product => write!(f, "product"),
        }
    }
}

/// Structured reference to the active context of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRef {
    pub kind: ContextKind,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ContextRef {
    /// Create a context reference without a title
    pub fn new(kind: ContextKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            title: None,
        }
    }

    /// Attach a human readable title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Build the system notice announcing a switch to this context
    pub fn switch_notice(&self) -> String {
        match &self.title {
            Some(title) => format!("Now discussing {} \"{}\" ({})", self.kind, title, self.id),
            None => format!("Now discussing {} {}", self.kind, self.id),
        }
    }
}

/// Snapshot of a document returned by the document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl DocumentSnapshot {
    /// Context reference pointing at this document
    pub fn to_context(&self) -> ContextRef {
        ContextRef::new(ContextKind::Document, self.id.clone()).with_title(self.title.clone())
    }
}
