//! Message types and the per-task conversation store.
//!
//! A [`Conversation`] starts with the task as a single user message and then
//! only grows by whole (model, user) exchanges, so an aborted iteration can
//! never leave half an exchange behind.

use serde::{Deserialize, Serialize};

use crate::constants::OBSERVATION_PREFIX;

/// The role of a message sender in the conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Ordered message history for one task.
///
/// Owned exclusively by the loop for the lifetime of a task and dropped when
/// the task ends.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Seeds the history with the task text.
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(task)],
        }
    }

    /// Appends the model's raw response and the observation it produced.
    pub fn record_exchange(&mut self, response: impl Into<String>, observation: &str) {
        self.messages.push(Message::model(response));
        self.messages
            .push(Message::user(format!("{OBSERVATION_PREFIX}{observation}")));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_starts_with_task() {
        let conv = Conversation::new("list my files");
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.messages()[0], Message::user("list my files"));
    }

    #[test]
    fn test_record_exchange_appends_pair() {
        let mut conv = Conversation::new("task");
        conv.record_exchange("Action: list_files({})", "a.txt");
        assert_eq!(conv.len(), 3);
        assert_eq!(conv.messages()[1].role, Role::Model);
        assert_eq!(conv.messages()[2].text(), "Observation: a.txt");
    }
}
