//! HTTP GET tool.
//!
//! Transport failures are reported to the model as a result with
//! `status_code` 0 and the error text as the body, so the model can try
//! another URL instead of the whole run failing.

use agentloop_core::error::ValidationError;
use agentloop_core::tool::{FunctionTool, ToolOutput};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use tracing::{debug, warn};

/// Bodies longer than this are cut before they reach the model.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct HttpGetParams {
    /// URL to fetch
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpGetResult {
    pub id: String,
    /// HTTP status code, 0 when no response was received
    pub status_code: u16,
    /// Response body
    pub body: String,
    /// Response headers (first value of each)
    pub headers: BTreeMap<String, String>,
}

impl ToolOutput for HttpGetResult {
    fn call_id(&self) -> &str {
        &self.id
    }
}

impl HttpGetResult {
    fn failed(id: String, reason: String) -> Self {
        Self {
            id,
            status_code: 0,
            body: reason,
            headers: BTreeMap::new(),
        }
    }
}

/// Fetch `url` and describe the response.
pub async fn fetch(
    client: &reqwest::Client,
    call_id: String,
    url: &str,
    max_body_bytes: usize,
) -> HttpGetResult {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return HttpGetResult::failed(call_id, "URL must start with http:// or https://".into());
    }

    debug!(url, "HTTP GET");
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(url, error = %e, "HTTP GET failed");
            return HttpGetResult::failed(call_id, format!("Error: {e}"));
        }
    };

    let status_code = response.status().as_u16();
    let mut headers = BTreeMap::new();
    for (name, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            headers
                .entry(name.as_str().to_string())
                .or_insert_with(|| value.to_string());
        }
    }

    let body = match response.text().await {
        Ok(text) => truncate(text, max_body_bytes),
        Err(e) => format!("Error reading response body: {e}"),
    };

    debug!(url, status_code, bytes = body.len(), "HTTP GET complete");
    HttpGetResult {
        id: call_id,
        status_code,
        body,
        headers,
    }
}

/// Cut `text` to at most `max` bytes on a char boundary.
fn truncate(mut text: String, max: usize) -> String {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
    text
}

/// The `http_get` tool.
pub fn http_get_tool(
    client: reqwest::Client,
    max_body_bytes: usize,
) -> Result<FunctionTool, ValidationError> {
    FunctionTool::builder("http_get")
        .description("Fetches content from a URL via HTTP GET request")
        .handler(move |id: String, params: HttpGetParams| {
            let client = client.clone();
            async move {
                Ok::<_, Infallible>(fetch(&client, id, &params.url, max_body_bytes).await)
            }
        })
        .build()
}
