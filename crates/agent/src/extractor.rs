//! Final structured-answer extraction.

use agentloop_core::error::Error;
use agentloop_core::gateway::LlmGateway;
use agentloop_core::message::Message;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::context::RunContext;
use crate::prompt::{PromptContext, PromptTemplate};
use crate::state::ConversationState;

/// Ask the model for its final answer and decode it as JSON into `T`.
pub async fn extract<T: DeserializeOwned>(
    gateway: &dyn LlmGateway,
    ctx: &RunContext,
    state: &mut ConversationState,
    output_prompt: &PromptTemplate,
    schema: &serde_json::Value,
) -> Result<T, Error> {
    extract_with(gateway, ctx, state, output_prompt, schema, |text| {
        serde_json::from_str::<T>(text)
    })
    .await
}

/// Like [`extract`], with a caller-supplied decoder.
///
/// The output instruction is appended as a user message and the raw answer
/// as a final assistant message, so both survive in the history whether or
/// not decoding succeeds. There is no retry: a malformed answer ends the run
/// with [`Error::InvalidResultSchema`].
pub async fn extract_with<T, E, D>(
    gateway: &dyn LlmGateway,
    ctx: &RunContext,
    state: &mut ConversationState,
    output_prompt: &PromptTemplate,
    schema: &serde_json::Value,
    decode: D,
) -> Result<T, Error>
where
    E: std::fmt::Display,
    D: FnOnce(&str) -> Result<T, E>,
{
    let instruction = output_prompt.render(&PromptContext::new())?;
    state.push(Message::user(instruction));

    debug!(gateway = gateway.name(), "Requesting structured output");
    let raw = ctx
        .guard(gateway.call_for_structured_output(state.messages(), schema))
        .await??;
    state.push(Message::assistant(raw.clone()).finished());

    decode(&raw).map_err(|e| {
        warn!(error = %e, "Final answer does not match the result schema");
        Error::InvalidResultSchema(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::SequentialMockGateway;
    use agentloop_core::message::Role;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sum {
        sum: i64,
    }

    fn schema() -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {"sum": {"type": "integer"}}})
    }

    #[tokio::test]
    async fn decodes_structured_answer() {
        let gateway = SequentialMockGateway::new(vec![]).with_structured(vec![r#"{"sum": 8}"#]);
        let mut state = ConversationState::new("sys", "{}");

        let sum: Sum = extract(
            &gateway,
            &RunContext::new(),
            &mut state,
            &PromptTemplate::output(),
            &schema(),
        )
        .await
        .unwrap();

        assert_eq!(sum, Sum { sum: 8 });
        assert_eq!(state.len(), 4);
        assert_eq!(state.messages()[2].role, Role::User);
        assert_eq!(state.messages()[3].content, r#"{"sum": 8}"#);
        assert!(state.messages()[3].is_final);
    }

    #[tokio::test]
    async fn malformed_answer_is_invalid_result_schema() {
        let gateway = SequentialMockGateway::new(vec![]).with_structured(vec!["not json"]);
        let mut state = ConversationState::new("sys", "{}");

        let err = extract::<Sum>(
            &gateway,
            &RunContext::new(),
            &mut state,
            &PromptTemplate::output(),
            &schema(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::InvalidResultSchema(_)));
        assert_eq!(gateway.structured_call_count(), 1);
    }

    #[tokio::test]
    async fn custom_decoder_is_used() {
        let gateway = SequentialMockGateway::new(vec![]).with_structured(vec!["  42 "]);
        let mut state = ConversationState::new("sys", "{}");

        let n = extract_with(
            &gateway,
            &RunContext::new(),
            &mut state,
            &PromptTemplate::output(),
            &schema(),
            |text| text.trim().parse::<u32>(),
        )
        .await
        .unwrap();
        assert_eq!(n, 42);
    }

    #[tokio::test]
    async fn cancelled_context_skips_the_call() {
        let gateway = SequentialMockGateway::new(vec![]).with_structured(vec![r#"{"sum":1}"#]);
        let mut state = ConversationState::new("sys", "{}");
        let ctx = RunContext::new();
        ctx.cancel();

        let err = extract::<Sum>(&gateway, &ctx, &mut state, &PromptTemplate::output(), &schema())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(gateway.structured_call_count(), 0);
    }
}
