//! Per-run conversation history.

use agentloop_core::message::{Message, Role};

/// Ordered messages of one run.
///
/// Index 0 is always the system message. It is the only message that is
/// ever replaced; everything after it is append-only.
#[derive(Debug, Clone)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    /// Start a conversation from the rendered system prompt and the caller's input.
    pub fn new(system_prompt: impl Into<String>, user_input: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::user(user_input)],
        }
    }

    /// Append a message to the end of the history.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the text of the system slot in place.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        // Slot 0 is created in `new` and never removed.
        if let Some(system) = self.messages.first_mut() {
            system.content = prompt.into();
        }
    }

    pub fn system_prompt(&self) -> &str {
        self.messages
            .first()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}
