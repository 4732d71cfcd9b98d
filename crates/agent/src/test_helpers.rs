//! Scripted gateway for engine tests.

use agentloop_core::error::ProviderError;
use agentloop_core::gateway::LlmGateway;
use agentloop_core::message::Message;
use agentloop_core::tool::{ToolCall, ToolDefinition};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A mock gateway that returns a sequence of scripted responses.
///
/// Each call to `call` returns the next turn in the queue and each call to
/// `call_for_structured_output` the next structured answer.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockGateway {
    turns: Mutex<Vec<Result<Message, ProviderError>>>,
    structured: Mutex<Vec<String>>,
    call_count: AtomicUsize,
    structured_call_count: AtomicUsize,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl SequentialMockGateway {
    pub fn new(turns: Vec<Message>) -> Self {
        Self::scripted(turns.into_iter().map(Ok).collect())
    }

    /// Script that may include gateway failures.
    pub fn scripted(turns: Vec<Result<Message, ProviderError>>) -> Self {
        Self {
            turns: Mutex::new(turns),
            structured: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
            structured_call_count: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_structured(self, answers: Vec<&str>) -> Self {
        *self.structured.lock().unwrap() = answers.into_iter().map(String::from).collect();
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn structured_call_count(&self) -> usize {
        self.structured_call_count.load(Ordering::SeqCst)
    }

    /// System prompt text the gateway saw on each free-form call.
    pub fn system_prompts(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|messages| messages[0].content.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl LlmGateway for SequentialMockGateway {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn call(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<Message, ProviderError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        let turns = self.turns.lock().unwrap();

        if count >= turns.len() {
            panic!(
                "SequentialMockGateway: no more turns (call #{}, have {})",
                count,
                turns.len()
            );
        }

        turns[count].clone()
    }

    async fn call_for_structured_output(
        &self,
        _messages: &[Message],
        _schema: &serde_json::Value,
    ) -> Result<String, ProviderError> {
        let count = self.structured_call_count.fetch_add(1, Ordering::SeqCst);
        let answers = self.structured.lock().unwrap();

        if count >= answers.len() {
            panic!(
                "SequentialMockGateway: no more structured answers (call #{}, have {})",
                count,
                answers.len()
            );
        }

        Ok(answers[count].clone())
    }
}

/// An assistant turn that requests tools.
pub fn tool_turn(calls: Vec<ToolCall>) -> Message {
    Message::assistant("I need to use a tool.").with_tool_calls(calls)
}

/// An assistant turn that signals completion.
pub fn final_turn(text: &str) -> Message {
    Message::assistant(text).finished()
}

/// Helper to create a tool call.
pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall::new(id, name, serde_json::to_string(&args).unwrap())
}
