//! Add tool: sums two numbers.

use agentloop_core::error::ValidationError;
use agentloop_core::tool::{FunctionTool, ToolOutput};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::debug;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddParams {
    /// First number to add
    pub num1: f64,
    /// Second number to add
    pub num2: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddResult {
    pub id: String,
    /// Sum of the two numbers
    pub sum: f64,
}

impl ToolOutput for AddResult {
    fn call_id(&self) -> &str {
        &self.id
    }
}

pub fn add(call_id: String, params: AddParams) -> AddResult {
    let sum = params.num1 + params.num2;
    debug!(num1 = params.num1, num2 = params.num2, sum, "add");
    AddResult { id: call_id, sum }
}

/// The `add` tool.
pub fn add_tool() -> Result<FunctionTool, ValidationError> {
    FunctionTool::builder("add")
        .description("Adds two numbers together")
        .handler(|id: String, params: AddParams| async move {
            Ok::<_, Infallible>(add(id, params))
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_core::tool::Tool;

    #[test]
    fn adds() {
        let result = add("c1".into(), AddParams { num1: 100.0, num2: 2.0 });
        assert_eq!(result, AddResult { id: "c1".into(), sum: 102.0 });
    }

    #[test]
    fn schema_describes_both_numbers() {
        let tool = add_tool().unwrap();
        let schema = tool.parameters_schema();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["num1"].is_object());
        assert_eq!(schema["required"], serde_json::json!(["num1", "num2"]));
    }

    #[tokio::test]
    async fn invoke_returns_typed_result() {
        let tool = add_tool().unwrap();
        let result = tool.invoke("call_7", r#"{"num1": 3, "num2": 5}"#).await.unwrap();
        let decoded: AddResult = result.decode().unwrap();
        assert_eq!(decoded.id, "call_7");
        assert_eq!(decoded.sum, 8.0);
    }
}
