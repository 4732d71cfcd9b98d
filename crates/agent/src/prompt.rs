//! Prompt templates.
//!
//! Templates use Tera syntax (`{{ tools }}`). Rendering is strict: a
//! placeholder with no value in the context is an error, never an empty
//! string. Autoescaping is off because prompts are plain text.

use agentloop_core::error::PromptError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Default system prompt. Parameters: `tools`, `tools_usage`,
/// `calling_limits`, `output_schema`, `behavior`.
pub const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are an agent that should act as specified in escaped content <BEHAVIOR></BEHAVIOR>.
Work in a loop of reasoning and acting:
1. THINK: state what you know and what you still need.
2. ACT: call one of the available tools when it helps; never invent tool results.
3. OBSERVE: read the tool results and decide whether to continue.
When you have everything you need, stop calling tools and say that you are done.
Never call a tool more times than its usage limit allows.

TOOLS AVAILABLE TO USE:
{{ tools }}

CURRENT TOOLS USAGE:
{{ tools_usage }}

TOOLS USAGE LIMITS:
{{ calling_limits }}

OUTPUT SCHEMA:
{{ output_schema }}

<BEHAVIOR>
{{ behavior }}
</BEHAVIOR>
"#;

/// Default final-answer instruction. Takes no parameters.
pub const OUTPUT_PROMPT_TEMPLATE: &str = "Using everything gathered in this conversation, \
produce the final answer now. Respond with a single JSON object that conforms exactly to the \
required output schema. Do not include explanations, markdown fences or any other text.";

/// Key/value context a template is rendered against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContext {
    values: BTreeMap<String, String>,
}

impl PromptContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pre-rendered text value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Insert a value serialized as compact JSON.
    pub fn insert_json<V: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &V,
    ) -> Result<&mut Self, PromptError> {
        let key = key.into();
        let text = serde_json::to_string(value).map_err(|e| PromptError::Value {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.values.insert(key, text);
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn to_tera(&self) -> tera::Context {
        let mut context = tera::Context::new();
        for (key, value) in &self.values {
            context.insert(key.as_str(), value);
        }
        context
    }
}

/// A named template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    source: String,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// The built-in system prompt.
    pub fn system() -> Self {
        Self::new("system", SYSTEM_PROMPT_TEMPLATE)
    }

    /// The built-in final-answer instruction.
    pub fn output() -> Self {
        Self::new("output", OUTPUT_PROMPT_TEMPLATE)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render against `context`.
    pub fn render(&self, context: &PromptContext) -> Result<String, PromptError> {
        tera::Tera::one_off(&self.source, &context.to_tera(), false).map_err(|e| {
            PromptError::Render {
                template: self.name.clone(),
                reason: error_chain(&e),
            }
        })
    }
}

/// Tera puts the useful detail ("Variable `x` not found") in the source chain.
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
