//! OpenAI-compatible gateway implementation.
//!
//! Works with OpenAI and any endpoint exposing the same
//! `/chat/completions` API (OpenRouter, Ollama, vLLM, ...).
//!
//! Supports:
//! - Chat completions with tool use / function calling
//! - Structured output through `response_format: json_schema`

use agentloop_core::error::ProviderError;
use agentloop_core::gateway::{LlmConfig, LlmGateway};
use agentloop_core::message::{Message, Role};
use agentloop_core::tool::{ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const FINISH_REASON_STOP: &str = "stop";
const FINISH_REASON_LENGTH: &str = "length";
const RESPONSE_SCHEMA_NAME: &str = "response_schema";
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// An OpenAI-compatible LLM gateway.
pub struct OpenAiCompatGateway {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatGateway")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatGateway {
    /// Create a gateway from connection settings.
    ///
    /// Fails with [`ProviderError::NotConfigured`] when no API key is set.
    pub fn new(config: &LlmConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ProviderError::NotConfigured("API key is not set".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: config.provider.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Convert our messages to OpenAI API format.
    ///
    /// An assistant turn with tool calls becomes the assistant message
    /// followed by one `tool` message per recorded result.
    fn to_api_messages(messages: &[Message]) -> Result<Vec<ApiMessage>, ProviderError> {
        let mut api_messages = Vec::with_capacity(messages.len());
        for m in messages {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };

            if m.tool_calls.is_empty() {
                api_messages.push(ApiMessage::text(role, &m.content));
                continue;
            }

            api_messages.push(ApiMessage {
                role: role.into(),
                content: (!m.content.is_empty()).then(|| m.content.clone()),
                tool_calls: Some(
                    m.tool_calls
                        .iter()
                        .map(|tc| ApiToolCall {
                            id: tc.id.clone(),
                            r#type: "function".into(),
                            function: ApiFunction {
                                name: tc.tool_name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect(),
                ),
                tool_call_id: None,
            });

            for result in &m.tool_results {
                let content = serde_json::to_string(&result.output).map_err(|e| {
                    ProviderError::ApiError {
                        status_code: 0,
                        message: format!("Failed to encode result of {}: {e}", result.tool_name),
                    }
                })?;
                api_messages.push(ApiMessage {
                    role: "tool".into(),
                    content: Some(content),
                    tool_calls: None,
                    tool_call_id: Some(result.id.clone()),
                });
            }
        }
        Ok(api_messages)
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        schema: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, ProviderError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(messages)?,
            "temperature": self.temperature,
        });

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(tools));
        }

        if let Some(schema) = schema {
            body["response_format"] = serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": RESPONSE_SCHEMA_NAME,
                    "description": "Response schema for structured output of a conversation",
                    "schema": schema,
                    "strict": false,
                }
            });
        }

        Ok(body)
    }

    async fn complete(&self, body: serde_json::Value) -> Result<ApiChoice, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(gateway = %self.name, model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gateway returned error");
            return Err(status_error(status, error_body, retry_after));
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            }
        })?;

        api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::EmptyResponse("No choices in response".into()))
    }
}

/// Map a non-200 status to an error.
fn status_error(status: u16, body: String, retry_after: Option<u64>) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Turn the first choice into an assistant message.
fn to_message(choice: ApiChoice) -> Message {
    let is_final = matches!(
        choice.finish_reason.as_deref(),
        Some(FINISH_REASON_STOP) | Some(FINISH_REASON_LENGTH)
    );

    let tool_calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCall::new(tc.id, tc.function.name, tc.function.arguments))
        .collect();

    let mut message =
        Message::assistant(choice.message.content.unwrap_or_default()).with_tool_calls(tool_calls);
    message.is_final = is_final;
    message
}

#[async_trait]
impl LlmGateway for OpenAiCompatGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, ProviderError> {
        let body = self.request_body(messages, tools, None)?;
        let choice = self.complete(body).await?;
        debug!(
            finish_reason = ?choice.finish_reason,
            tool_calls = choice.message.tool_calls.as_ref().map_or(0, Vec::len),
            "Received completion"
        );
        Ok(to_message(choice))
    }

    async fn call_for_structured_output(
        &self,
        messages: &[Message],
        schema: &serde_json::Value,
    ) -> Result<String, ProviderError> {
        let body = self.request_body(messages, &[], Some(schema))?;
        let choice = self.complete(body).await?;
        choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::EmptyResponse("Structured output was empty".into()))
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ApiMessage {
    fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_core::tool::ToolResult;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn config(base_url: &str) -> LlmConfig {
        LlmConfig {
            api_key: Some("sk-test".into()),
            base_url: base_url.into(),
            model: "gpt-test".into(),
            ..LlmConfig::default()
        }
    }

    fn gateway() -> OpenAiCompatGateway {
        OpenAiCompatGateway::new(&config("https://api.openai.com/v1/")).unwrap()
    }

    #[test]
    fn missing_api_key_is_not_configured() {
        let err = OpenAiCompatGateway::new(&LlmConfig::default()).unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));

        let blank = LlmConfig {
            api_key: Some("   ".into()),
            ..LlmConfig::default()
        };
        assert!(OpenAiCompatGateway::new(&blank).is_err());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(gateway().base_url, "https://api.openai.com/v1");
        assert_eq!(gateway().name(), "openai");
    }

    #[test]
    fn debug_redacts_key() {
        let debug = format!("{:?}", gateway());
        assert!(!debug.contains("sk-test"));
    }

    #[test]
    fn message_conversion() {
        let messages = vec![Message::system("You are helpful"), Message::user("Hello")];
        let api_messages = OpenAiCompatGateway::to_api_messages(&messages).unwrap();
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
    }

    #[test]
    fn tool_results_become_tool_messages() {
        let mut turn = Message::assistant("").with_tool_calls(vec![
            ToolCall::new("call_1", "add", r#"{"num1":1,"num2":2}"#),
            ToolCall::new("call_2", "add", r#"{"num1":3,"num2":4}"#),
        ]);
        turn.tool_results = vec![
            ToolResult::new("call_1", "add", serde_json::json!({"id": "call_1", "sum": 3.0})),
            ToolResult::new("call_2", "add", serde_json::json!({"id": "call_2", "sum": 7.0})),
        ];

        let api = OpenAiCompatGateway::to_api_messages(&[turn]).unwrap();

        assert_eq!(api.len(), 3);
        assert_eq!(api[0].role, "assistant");
        assert!(api[0].content.is_none());
        let calls = api[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[1].function.name, "add");
        assert_eq!(calls[1].r#type, "function");
        assert_eq!(api[1].role, "tool");
        assert_eq!(api[1].tool_call_id.as_deref(), Some("call_1"));
        let payload: serde_json::Value =
            serde_json::from_str(api[2].content.as_deref().unwrap()).unwrap();
        assert_eq!(payload["sum"], 7.0);
    }

    #[test]
    fn tool_definition_conversion() {
        let tools = vec![ToolDefinition {
            name: "http_get".into(),
            description: "Fetch a URL".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let api_tools = OpenAiCompatGateway::to_api_tools(&tools);
        assert_eq!(api_tools.len(), 1);
        assert_eq!(api_tools[0].function.name, "http_get");
        assert_eq!(api_tools[0].r#type, "function");
    }

    #[test]
    fn structured_request_carries_response_format() {
        let schema = serde_json::json!({"type": "object"});
        let body = gateway()
            .request_body(&[Message::user("hi")], &[], Some(&schema))
            .unwrap();
        assert_eq!(body["model"], "gpt-test");
        assert!(body.get("tools").is_none());
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(
            body["response_format"]["json_schema"]["name"],
            RESPONSE_SCHEMA_NAME
        );
        assert_eq!(body["response_format"]["json_schema"]["schema"], schema);
    }

    #[test]
    fn finish_reason_maps_to_is_final() {
        let parse = |reason: &str| -> ApiChoice {
            serde_json::from_value(serde_json::json!({
                "message": {"role": "assistant", "content": "ok"},
                "finish_reason": reason,
            }))
            .unwrap()
        };
        assert!(to_message(parse("stop")).is_final);
        assert!(to_message(parse("length")).is_final);
        assert!(!to_message(parse("tool_calls")).is_final);
    }

    #[test]
    fn tool_calls_are_parsed() {
        let choice: ApiChoice = serde_json::from_value(serde_json::json!({
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_abc",
                    "type": "function",
                    "function": {"name": "add", "arguments": "{\"num1\":3,\"num2\":5}"}
                }]
            },
            "finish_reason": "tool_calls"
        }))
        .unwrap();

        let message = to_message(choice);
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, "");
        assert_eq!(message.tool_calls[0].id, "call_abc");
        assert_eq!(message.tool_calls[0].tool_name, "add");
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            status_error(429, String::new(), Some(12)),
            ProviderError::RateLimited { retry_after_secs: 12 }
        ));
        assert!(matches!(
            status_error(429, String::new(), None),
            ProviderError::RateLimited { retry_after_secs: DEFAULT_RETRY_AFTER_SECS }
        ));
        assert!(matches!(
            status_error(401, String::new(), None),
            ProviderError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            status_error(500, "boom".into(), None),
            ProviderError::ApiError { status_code: 500, .. }
        ));
    }

    /// Serve exactly one canned HTTP response and return the base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/v1")
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(split) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..split]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= split + 4 + length
    }

    #[tokio::test]
    async fn call_round_trip_over_http() {
        let base = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"done"},"finish_reason":"stop"}]}"#,
        )
        .await;
        let gateway = OpenAiCompatGateway::new(&config(&base)).unwrap();

        let message = gateway.call(&[Message::user("hi")], &[]).await.unwrap();
        assert_eq!(message.content, "done");
        assert!(message.is_final);
    }

    #[tokio::test]
    async fn structured_output_over_http() {
        let base = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"sum\":8}"},"finish_reason":"stop"}]}"#,
        )
        .await;
        let gateway = OpenAiCompatGateway::new(&config(&base)).unwrap();

        let text = gateway
            .call_for_structured_output(&[Message::user("hi")], &serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(text, r#"{"sum":8}"#);
    }

    #[tokio::test]
    async fn unauthorized_over_http() {
        let base = serve_once("401 Unauthorized", r#"{"error":"bad key"}"#).await;
        let gateway = OpenAiCompatGateway::new(&config(&base)).unwrap();

        let err = gateway.call(&[Message::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn empty_choices_is_empty_response() {
        let base = serve_once("200 OK", r#"{"choices":[]}"#).await;
        let gateway = OpenAiCompatGateway::new(&config(&base)).unwrap();

        let err = gateway.call(&[Message::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse(_)));
    }
}
