//! In-memory conversation history.
//!
//! One [`ConversationStore`] is created by the server process and handed to
//! every relay session. Histories live until the process exits.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::Message;

/// Shared map from conversation id to its ordered message history.
///
/// Cloning is cheap and every clone sees the same conversations.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    conversations: Arc<RwLock<HashMap<String, Vec<Message>>>>,
}

impl ConversationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the history for `id`; empty when the id is unknown
    pub async fn get(&self, id: &str) -> Vec<Message> {
        self.conversations
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Append whole turns to the history for `id`, creating it if needed.
    ///
    /// The extension happens under the write lock, so readers see either
    /// the old history or the fully extended one. Two exchanges committing
    /// to the same id are applied one after the other; neither is lost.
    pub async fn append(&self, id: &str, messages: impl IntoIterator<Item = Message>) {
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(id.to_string())
            .or_default()
            .extend(messages);
    }

    /// Whether any history has been committed for `id`
    pub async fn contains(&self, id: &str) -> bool {
        self.conversations.read().await.contains_key(id)
    }

    /// Number of conversations with committed history
    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_id_is_empty() {
        let store = ConversationStore::new();
        assert!(store.get("missing").await.is_empty());
        assert!(!store.contains("missing").await);
        assert_eq!(store.conversation_count().await, 0);
    }

    #[tokio::test]
    async fn test_append_then_get_preserves_order() {
        let store = ConversationStore::new();
        store
            .append("c1", vec![Message::user("hi"), Message::assistant("hello")])
            .await;
        store
            .append("c1", vec![Message::user("again"), Message::assistant("sure")])
            .await;

        assert_eq!(
            store.get("c1").await,
            vec![
                Message::user("hi"),
                Message::assistant("hello"),
                Message::user("again"),
                Message::assistant("sure"),
            ]
        );
        assert_eq!(store.conversation_count().await, 1);
    }

    #[tokio::test]
    async fn test_ids_are_partitioned() {
        let store = ConversationStore::new();
        store.append("a", vec![Message::user("for a")]).await;
        store.append("b", vec![Message::user("for b")]).await;

        assert_eq!(store.get("a").await, vec![Message::user("for a")]);
        assert_eq!(store.get("b").await, vec![Message::user("for b")]);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = ConversationStore::new();
        let other = store.clone();
        other.append("c1", vec![Message::user("shared")]).await;

        assert!(store.contains("c1").await);
    }

    #[tokio::test]
    async fn test_concurrent_appends_to_same_id_are_all_kept() {
        let store = ConversationStore::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append(
                        "c1",
                        vec![
                            Message::user(format!("q{}", i)),
                            Message::assistant(format!("a{}", i)),
                        ],
                    )
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let history = store.get("c1").await;
        assert_eq!(history.len(), 32);
        // Each exchange's pair stays adjacent
        for pair in history.chunks(2) {
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
    }
}
