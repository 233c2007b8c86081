use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::TokenUsage;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Prior turns, oldest first
pub type History = Vec<ChatMessage>;

/// The full conversation to send: history followed by the new user turn.
pub fn conversation(history: &[ChatMessage], message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(message));
    messages
}

/// Completion request
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
        }
    }
}

/// Completion response
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Extracted answer, fence-stripped and trimmed
    pub content: String,
    pub usage: Option<TokenUsage>,
    /// Decoded response body, kept for diagnostics
    pub raw: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conversation_appends_user_turn_last() {
        let history = vec![ChatMessage::system("be brief"), ChatMessage::assistant("ok")];
        let messages = conversation(&history, "hello");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], history[0]);
        assert_eq!(messages[1], history[1]);
        assert_eq!(messages[2], ChatMessage::user("hello"));
    }

    #[test]
    fn request_serializes_model_and_messages() {
        let request = CompletionRequest::new("gpt-4o", conversation(&[], "diff"));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"model": "gpt-4o", "messages": [{"role": "user", "content": "diff"}]})
        );
    }

    #[test]
    fn message_wire_shape() {
        let value = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(value, json!({"role": "assistant", "content": "hi"}));
    }
}
