//! In-memory collaborators

use async_trait::async_trait;
use dashmap::DashMap;
use livechat_core::{
    DocumentSnapshot, DocumentStore, MessageStore, PromptContext, Responder, StoreResult, UserId,
};
use parking_lot::Mutex;

/// A message recorded by [`InMemoryMessageStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub user_id: UserId,
    pub target: String,
    pub text: String,
}

/// Message store keeping everything in a vector
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: Mutex<Vec<StoredMessage>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<StoredMessage> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn store_message(
        &self,
        user_id: &UserId,
        room_or_session: &str,
        text: &str,
    ) -> StoreResult<()> {
        self.messages.lock().push(StoredMessage {
            user_id: user_id.clone(),
            target: room_or_session.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Document store filled programmatically
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: DashMap<String, DocumentSnapshot>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, document: DocumentSnapshot) {
        self.documents.insert(document.id.clone(), document);
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn fetch_document(&self, document_id: &str) -> StoreResult<Option<DocumentSnapshot>> {
        Ok(self.documents.get(document_id).map(|d| d.clone()))
    }
}

/// Deterministic responder that answers from the prompt and context
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoResponder;

#[async_trait]
impl Responder for EchoResponder {
    async fn generate(&self, prompt: PromptContext) -> StoreResult<String> {
        Ok(match prompt.context {
            Some(context) => format!("[{} {}] {}", context.kind, context.id, prompt.prompt),
            None => prompt.prompt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livechat_core::{ContextKind, ContextRef};

    #[tokio::test]
    async fn test_message_store_records() {
        let store = InMemoryMessageStore::new();
        let alice = UserId::parse("alice").unwrap();
        store.store_message(&alice, "lobby", "hi").await.unwrap();

        assert_eq!(
            store.messages(),
            vec![StoredMessage {
                user_id: alice,
                target: "lobby".to_string(),
                text: "hi".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_document_store_lookup() {
        let store = InMemoryDocumentStore::new();
        store.insert(DocumentSnapshot {
            id: "d1".to_string(),
            title: "Manual".to_string(),
            content: String::new(),
            metadata: serde_json::Value::Null,
        });

        assert!(store.fetch_document("d1").await.unwrap().is_some());
        assert!(store.fetch_document("d2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_echo_responder_mentions_context() {
        let prompt = PromptContext {
            user_id: UserId::parse("alice").unwrap(),
            context: Some(ContextRef::new(ContextKind::Quote, "Q-1")),
            history: Vec::new(),
            prompt: "price?".to_string(),
        };
        assert_eq!(EchoResponder.generate(prompt).await.unwrap(), "[quote Q-1] price?");
    }
}
