use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Append-only message history of one consultation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: ChatRole, text: impl Into<String>) -> &ChatMessage {
        self.messages.push(ChatMessage::new(role, text));
        let last = self.messages.len() - 1;
        &self.messages[last]
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{ChatRole, Transcript};

    #[test]
    fn push_keeps_order_and_assigns_unique_ids() {
        let mut transcript = Transcript::new();
        transcript.push(ChatRole::Model, "welcome");
        transcript.push(ChatRole::User, "why yellow leaves?");
        transcript.push(ChatRole::Model, "overwatering");

        let roles: Vec<ChatRole> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::Model, ChatRole::User, ChatRole::Model]);
        let ids: HashSet<&str> = transcript.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert!(transcript
            .messages()
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ChatRole::Model).unwrap(), "\"model\"");
    }
}
