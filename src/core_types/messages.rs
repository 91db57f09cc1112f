//! Requests and chat messages shared by every adapter.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Message roles for backend chat payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A role + text pair as sent on the wire by the chat-style backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// One prompt to run against a model.
///
/// Immutable once built. The dispatcher wraps it in an `Arc` and every
/// per-model worker reads the same instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    prompt: Arc<str>,
    system_prompt: Arc<str>,
}

impl CallRequest {
    pub fn new(prompt: impl Into<Arc<str>>, system_prompt: impl Into<Arc<str>>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: system_prompt.into(),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// System + user pair for chat-style backends. An empty system prompt
    /// is left out.
    pub fn chat_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage::system(self.system_prompt()));
        }
        messages.push(ChatMessage::user(self.prompt()));
        messages
    }
}
