//! OpenAI-compatible chat completions client

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::LlmConfig;

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A chat message in OpenAI wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Result of a tool call, answering `tool_call_id`
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Tool calls requested by the model, if any
    pub fn requested_tools(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }

    /// Text content, empty when absent
    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

/// Function name plus JSON-encoded arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

impl FunctionCall {
    /// Decode the argument string. Empty arguments decode to an empty object.
    pub fn parsed_arguments(&self) -> Result<Value> {
        if self.arguments.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&self.arguments)
            .with_context(|| format!("Invalid arguments for tool {}", self.name))
    }
}

/// Tool definition sent with a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the parameters
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            tool_type: function_type(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

fn function_type() -> String {
    "function".to_string()
}

/// Sampling options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

/// Backoff policy for retryable failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (0-based), doubling each time
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Chat completions client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct LlmClient {
    base_url: String,
    api_key: String,
    model: String,
    options: ChatOptions,
    retry: RetryConfig,
    client: reqwest::Client,
}

impl LlmClient {
    /// Create a client from configuration
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
            options: ChatOptions {
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            },
            retry: RetryConfig {
                max_retries: config.max_retries,
                ..Default::default()
            },
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one chat completion request and return the assistant message
    #[instrument(skip(self, messages, tools), fields(model = %self.model, messages = messages.len()))]
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ChatMessage> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
            tools: tools.filter(|t| !t.is_empty()),
        };

        let body = self.post_with_retry(&url, &request).await?;
        parse_completion(&body)
    }

    async fn post_with_retry(&self, url: &str, request: &ChatRequest<'_>) -> Result<String> {
        let mut attempt = 0;

        loop {
            let result = self
                .client
                .post(url)
                .bearer_auth(&self.api_key)
                .json(request)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    return response
                        .text()
                        .await
                        .context("Failed to read chat completion response");
                }
                Ok(response) => {
                    let status = response.status();
                    if is_retryable(status) && attempt < self.retry.max_retries {
                        let wait = retry_after(&response)
                            .map(|d| d.min(self.retry.max_delay))
                            .unwrap_or_else(|| self.retry.delay_for(attempt));
                        warn!(%status, attempt, wait_ms = wait.as_millis() as u64, "Retrying chat completion");
                        tokio::time::sleep(wait).await;
                        attempt += 1;
                        continue;
                    }

                    let body = response.text().await.unwrap_or_default();
                    anyhow::bail!(
                        "Chat completion failed with status {}: {}",
                        status,
                        api_error_message(&body)
                    );
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.retry.max_retries => {
                    let wait = self.retry.delay_for(attempt);
                    warn!(error = %e, attempt, "Chat completion request failed, retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to reach {}", url));
                }
            }
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Pull the human-readable message out of an API error body
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.chars().take(500).collect(),
    }
}

/// Extract the first choice's message from a completion body
fn parse_completion(body: &str) -> Result<ChatMessage> {
    let completion: ChatCompletion =
        serde_json::from_str(body).context("Failed to parse chat completion response")?;

    if let Some(usage) = completion.usage {
        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "Chat completion usage"
        );
    }

    let choice = completion
        .choices
        .into_iter()
        .next()
        .context("Chat completion returned no choices")?;

    debug!(finish_reason = ?choice.finish_reason, "Chat completion finished");
    Ok(choice.message)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_text_completion() {
        let body = json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "What technical skills do you have?"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 8, "total_tokens": 18}
        })
        .to_string();

        let message = parse_completion(&body).unwrap();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content_str(), "What technical skills do you have?");
        assert!(message.requested_tools().is_empty());
    }

    #[test]
    fn test_parse_tool_call_completion() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "search_internet", "arguments": "{\"query\":\"data jobs Colombo\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })
        .to_string();

        let message = parse_completion(&body).unwrap();
        assert_eq!(message.content, None);
        let calls = message.requested_tools();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "search_internet");
        let args = calls[0].function.parsed_arguments().unwrap();
        assert_eq!(args["query"], "data jobs Colombo");
    }

    #[test]
    fn test_parse_no_choices_errors() {
        let err = parse_completion(r#"{"choices": []}"#).unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(api_error_message(body), "Incorrect API key provided");
        assert_eq!(api_error_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn test_request_serialization_skips_empty_fields() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let request = ChatRequest {
            model: "gpt-4-turbo-preview",
            messages: &messages,
            temperature: 0.7,
            max_tokens: None,
            tools: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value.get("max_tokens").is_none());
        assert_eq!(value["messages"][1]["role"], "user");
        assert!(value["messages"][1].get("tool_call_id").is_none());
    }

    #[test]
    fn test_tool_message_serialization() {
        let value = serde_json::to_value(ChatMessage::tool("call_9", "results")).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_call_id"], "call_9");
    }

    #[test]
    fn test_retry_delay_backoff() {
        let retry = RetryConfig {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        };
        assert_eq!(retry.delay_for(0), Duration::from_secs(1));
        assert_eq!(retry.delay_for(1), Duration::from_secs(2));
        assert_eq!(retry.delay_for(2), Duration::from_secs(4));
        assert_eq!(retry.delay_for(3), Duration::from_secs(5));
        assert_eq!(retry.delay_for(40), Duration::from_secs(5));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_client_strips_trailing_slash() {
        let config = LlmConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..Default::default()
        };
        let client = LlmClient::new(&config, "key").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080/v1");
        assert_eq!(client.model(), "gpt-4-turbo-preview");
    }

    #[tokio::test]
    async fn test_server_error_retried_then_succeeds() {
        let server = mock::MockServer::start(vec![
            mock::Reply::status(503, json!({"error": {"message": "overloaded"}}))
                .with_header("Retry-After", "0"),
            mock::Reply::text("Recovered"),
        ])
        .await;
        let config = LlmConfig {
            max_retries: 1,
            ..server.config()
        };
        let client = LlmClient::new(&config, "key").unwrap();

        let reply = client.chat(&[ChatMessage::user("hi")], None).await.unwrap();
        assert_eq!(reply.content_str(), "Recovered");
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_server_error_without_retries_reports_message() {
        let server = mock::MockServer::start(vec![mock::Reply::status(
            503,
            json!({"error": {"message": "overloaded"}}),
        )])
        .await;
        let client = LlmClient::new(&server.config(), "key").unwrap();

        let err = client.chat(&[ChatMessage::user("hi")], None).await.unwrap_err();
        assert!(err.to_string().contains("overloaded"));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_after_capped_by_max_delay() {
        let server = mock::MockServer::start(vec![
            mock::Reply::status(429, json!({"error": {"message": "slow down"}}))
                .with_header("Retry-After", "86400"),
            mock::Reply::text("ok"),
        ])
        .await;
        let config = LlmConfig {
            max_retries: 1,
            ..server.config()
        };
        let mut client = LlmClient::new(&config, "key").unwrap();
        client.retry.max_delay = Duration::from_millis(50);

        let reply = tokio::time::timeout(
            Duration::from_secs(5),
            client.chat(&[ChatMessage::user("hi")], None),
        )
        .await
        .expect("retry should not wait for the full Retry-After")
        .unwrap();
        assert_eq!(reply.content_str(), "ok");
    }
}
