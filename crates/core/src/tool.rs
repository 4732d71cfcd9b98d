//! Tool trait: the abstraction over agent capabilities.
//!
//! A tool is a named, schema-described function the model can ask the
//! engine to run. Each tool declares a concrete parameter type and a
//! concrete output type; both are erased to JSON once a call is recorded
//! in the conversation.

use async_trait::async_trait;
use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

use crate::error::{BoxError, ToolError, ValidationError};
use crate::schema::schema_for;
use crate::validation;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation token from the model (unique within a turn)
    pub id: String,

    /// Name of the tool to execute
    pub tool_name: String,

    /// Arguments, a JSON object encoded as text
    pub arguments: String,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments: arguments.into(),
        }
    }
}

/// The recorded result of a successful tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result answers
    pub id: String,

    /// The tool that produced it
    pub tool_name: String,

    /// The tool's output value, serialized
    pub output: serde_json::Value,
}

impl ToolResult {
    pub fn new(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        output: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            output,
        }
    }

    /// Decode the output back into the tool's concrete result type.
    pub fn decode<R: DeserializeOwned>(&self) -> serde_json::Result<R> {
        R::deserialize(&self.output)
    }
}

/// Capability every tool output type provides: it knows which call it answers.
pub trait ToolOutput: Serialize + Send + 'static {
    fn call_id(&self) -> &str;
}

/// Generic output wrapper for tools that don't need their own struct.
///
/// Serializes as `{"id": ..., <fields of T>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolReply<T> {
    pub id: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T> ToolReply<T> {
    pub fn new(id: impl Into<String>, data: T) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

impl<T: Serialize + Send + 'static> ToolOutput for ToolReply<T> {
    fn call_id(&self) -> &str {
        &self.id
    }
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// The core Tool trait.
///
/// Implementations decode `arguments` themselves so that a malformed
/// payload can be reported as [`ToolError::InvalidArguments`], distinct
/// from a failure of the tool's own logic.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "add", "http_get").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool for the call `call_id` with JSON-text `arguments`.
    async fn invoke(&self, call_id: &str, arguments: &str) -> Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

type HandlerFuture = BoxFuture<'static, Result<serde_json::Value, BoxError>>;
type Handler = Arc<dyn Fn(String, &str) -> serde_json::Result<HandlerFuture> + Send + Sync>;
type SchemaFn = fn() -> serde_json::Result<serde_json::Value>;

/// A tool backed by a typed async function.
///
/// Built with [`FunctionTool::builder`]; the handler receives the call id
/// and the decoded parameters and returns its own output type.
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: serde_json::Value,
    handler: Handler,
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl FunctionTool {
    pub fn builder(name: impl Into<String>) -> FunctionToolBuilder {
        FunctionToolBuilder {
            name: name.into(),
            description: String::new(),
            parameters: None,
            generated_schema: None,
            handler: None,
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        self.parameters.clone()
    }

    async fn invoke(&self, call_id: &str, arguments: &str) -> Result<ToolResult, ToolError> {
        let future = (self.handler)(call_id.to_string(), arguments).map_err(|e| {
            ToolError::InvalidArguments {
                tool_name: self.name.clone(),
                reason: e.to_string(),
            }
        })?;

        let output = future
            .await
            .map_err(|source| ToolError::ExecutionFailed {
                tool_name: self.name.clone(),
                source,
            })?;

        Ok(ToolResult::new(call_id, &self.name, output))
    }
}

/// Builder for [`FunctionTool`]; validation happens in [`build`](Self::build).
pub struct FunctionToolBuilder {
    name: String,
    description: String,
    parameters: Option<serde_json::Value>,
    generated_schema: Option<SchemaFn>,
    handler: Option<Handler>,
}

impl FunctionToolBuilder {
    /// Set the description shown to the model.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Use an explicit parameter schema instead of the one derived from
    /// the handler's parameter type.
    pub fn parameters_schema(mut self, schema: serde_json::Value) -> Self {
        self.parameters = Some(schema);
        self
    }

    /// Set the handler. The parameter schema is derived from `P`.
    pub fn handler<P, R, E, F, Fut>(mut self, handler: F) -> Self
    where
        P: DeserializeOwned + JsonSchema + Send + 'static,
        R: ToolOutput,
        E: Into<BoxError>,
        F: Fn(String, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        self.generated_schema = Some(schema_for::<P>);
        self.handler = Some(Arc::new(
            move |call_id: String, arguments: &str| -> serde_json::Result<HandlerFuture> {
                let params: P = decode_arguments(arguments)?;
                let pending = handler(call_id.clone(), params);
                Ok(Box::pin(async move {
                    let output: R = pending.await.map_err(Into::<BoxError>::into)?;
                    if output.call_id() != call_id {
                        return Err(BoxError::from(format!(
                            "result id '{}' does not match call id '{}'",
                            output.call_id(),
                            call_id
                        )));
                    }
                    let value = serde_json::to_value(&output)?;
                    Ok::<serde_json::Value, BoxError>(value)
                }))
            },
        ));
        self
    }

    /// Validate and build the tool.
    pub fn build(self) -> Result<FunctionTool, ValidationError> {
        validation::name_is_valid(&self.name)?;
        validation::description_is_valid(&self.description)?;

        let handler = self.handler.ok_or(ValidationError::Missing("tool handler"))?;

        let parameters = match (self.parameters, self.generated_schema) {
            (Some(explicit), _) => explicit,
            (None, Some(generate)) => {
                generate().map_err(|_| ValidationError::InvalidSchema(self.name.clone()))?
            }
            (None, None) => return Err(ValidationError::Missing("parameter schema")),
        };
        if !parameters.is_object() {
            return Err(ValidationError::InvalidSchema(self.name));
        }

        Ok(FunctionTool {
            name: self.name,
            description: self.description,
            parameters,
            handler,
        })
    }
}

/// Decode JSON-text tool arguments. An empty payload decodes as `{}`.
pub fn decode_arguments<P: DeserializeOwned>(arguments: &str) -> serde_json::Result<P> {
    let trimmed = arguments.trim();
    if trimmed.is_empty() {
        serde_json::from_str("{}")
    } else {
        serde_json::from_str(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[derive(Deserialize, JsonSchema)]
    struct EchoParams {
        text: String,
    }

    fn echo_tool() -> FunctionTool {
        FunctionTool::builder("echo")
            .description("Echoes back the input")
            .handler(|id: String, params: EchoParams| async move {
                Ok::<_, Infallible>(ToolReply::new(
                    id,
                    serde_json::json!({ "text": params.text }),
                ))
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn function_tool_invokes_handler() {
        let tool = echo_tool();
        let result = tool
            .invoke("call_1", r#"{"text": "hello world"}"#)
            .await
            .unwrap();
        assert_eq!(result.id, "call_1");
        assert_eq!(result.tool_name, "echo");
        assert_eq!(result.output["text"], "hello world");
        assert_eq!(result.output["id"], "call_1");
    }

    #[tokio::test]
    async fn malformed_arguments_are_invalid_arguments() {
        let tool = echo_tool();
        let err = tool.invoke("call_1", r#"{"txt": 1}"#).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { ref tool_name, .. } if tool_name == "echo"));

        let err = tool.invoke("call_1", "not json").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn handler_failure_is_execution_failed() {
        let tool = FunctionTool::builder("fail")
            .description("Always fails")
            .handler(|_id: String, _params: EchoParams| async move {
                Err::<ToolReply<()>, _>("boom")
            })
            .build()
            .unwrap();

        let err = tool.invoke("c", r#"{"text": ""}"#).await.unwrap_err();
        match err {
            ToolError::ExecutionFailed { tool_name, source } => {
                assert_eq!(tool_name, "fail");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn mismatched_result_id_is_a_tool_failure() {
        let tool = FunctionTool::builder("liar")
            .description("Returns the wrong id")
            .handler(|_id: String, _params: EchoParams| async move {
                Ok::<_, Infallible>(ToolReply::new("other", ()))
            })
            .build()
            .unwrap();

        let err = tool.invoke("call_9", r#"{"text": ""}"#).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }

    #[test]
    fn builder_validates() {
        let no_handler = FunctionTool::builder("echo").description("d").build();
        assert_eq!(
            no_handler.unwrap_err(),
            ValidationError::Missing("tool handler")
        );

        let bad_name = FunctionTool::builder("Echo")
            .description("d")
            .handler(|id: String, _p: EchoParams| async move {
                Ok::<_, Infallible>(ToolReply::new(id, ()))
            })
            .build();
        assert!(matches!(bad_name, Err(ValidationError::Pattern { .. })));

        let no_description = FunctionTool::builder("echo")
            .handler(|id: String, _p: EchoParams| async move {
                Ok::<_, Infallible>(ToolReply::new(id, ()))
            })
            .build();
        assert!(matches!(
            no_description,
            Err(ValidationError::Empty {
                field: "description"
            })
        ));
    }

    #[test]
    fn definition_carries_generated_schema() {
        let def = echo_tool().to_definition();
        assert_eq!(def.name, "echo");
        assert_eq!(def.parameters["properties"]["text"]["type"], "string");
    }

    #[test]
    fn result_decodes_to_typed_output() {
        #[derive(Deserialize)]
        struct Sum {
            id: String,
            sum: f64,
        }
        let result = ToolResult::new("c1", "add", serde_json::json!({"id": "c1", "sum": 8.0}));
        let sum: Sum = result.decode().unwrap();
        assert_eq!(sum.id, "c1");
        assert_eq!(sum.sum, 8.0);
    }

    #[test]
    fn empty_arguments_decode_as_empty_object() {
        #[derive(Deserialize)]
        struct NoParams {}
        assert!(decode_arguments::<NoParams>("  ").is_ok());
    }
}
