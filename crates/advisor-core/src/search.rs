//! Internet search through the Serper API

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::SearchConfig;
use crate::tools::{Tool, ToolResult};

/// A single organic search hit
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<SearchResult>,
}

/// Serper search client
#[derive(Debug, Clone)]
pub struct SerperClient {
    endpoint: String,
    api_key: String,
    num_results: usize,
    client: reqwest::Client,
}

impl SerperClient {
    pub fn new(config: &SearchConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: api_key.into(),
            num_results: config.num_results,
            client,
        })
    }

    /// Run a query, returning at most `limit` organic results
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let body = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&SearchRequest { q: query, num: limit })
            .send()
            .await
            .context("Failed to connect to search API")?
            .error_for_status()
            .context("Search request failed")?
            .text()
            .await
            .context("Failed to read search response")?;

        let results = parse_results(&body, limit)?;
        debug!(results = results.len(), "Search complete");
        Ok(results)
    }
}

fn parse_results(body: &str, limit: usize) -> Result<Vec<SearchResult>> {
    let response: SearchResponse =
        serde_json::from_str(body).context("Failed to parse search response")?;

    Ok(response
        .organic
        .into_iter()
        .filter(|r| !r.title.is_empty() && !r.link.is_empty())
        .take(limit)
        .collect())
}

/// Render results as numbered text for the model
pub fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results found for: {}", query);
    }

    let mut output = format!("Search results for '{}':\n\n", query);
    for (i, result) in results.iter().enumerate() {
        output.push_str(&format!(
            "{}. {}\n   {}\n   {}\n\n",
            i + 1,
            result.title,
            result.link,
            result.snippet
        ));
    }
    output
}

/// Search tool exposed to agents
pub struct SearchTool {
    client: SerperClient,
}

impl SearchTool {
    pub fn new(client: SerperClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search_internet"
    }

    fn description(&self) -> &str {
        "Search the internet for current information such as job postings, salaries and market trends. Returns titles, links and snippets."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "The search query"},
                "limit": {"type": "number", "description": "Maximum number of results"}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let query = match args.get("query").and_then(|v| v.as_str()) {
            Some(q) if !q.trim().is_empty() => q,
            _ => return Ok(ToolResult::error("Missing required parameter: query")),
        };

        let limit = args
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(self.client.num_results);

        match self.client.search(query, limit).await {
            Ok(results) => Ok(ToolResult::success(format_results(query, &results))),
            Err(e) => {
                warn!(error = %e, "Search failed");
                Ok(ToolResult::error(format!("Search failed: {:#}", e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_organic_results() {
        let body = json!({
            "searchParameters": {"q": "software jobs sri lanka"},
            "organic": [
                {"title": "Software Engineer - WSO2", "link": "https://wso2.com/careers", "snippet": "Join us", "position": 1},
                {"title": "", "link": "https://example.com", "snippet": "untitled"},
                {"title": "Data Analyst - Dialog", "link": "https://dialog.lk/careers"}
            ]
        })
        .to_string();

        let results = parse_results(&body, 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Software Engineer - WSO2");
        assert_eq!(results[1].snippet, "");
    }

    #[test]
    fn test_parse_respects_limit() {
        let body = json!({
            "organic": [
                {"title": "a", "link": "https://a"},
                {"title": "b", "link": "https://b"},
                {"title": "c", "link": "https://c"}
            ]
        })
        .to_string();
        assert_eq!(parse_results(&body, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_missing_organic() {
        assert!(parse_results("{}", 5).unwrap().is_empty());
        assert!(parse_results("not json", 5).is_err());
    }

    #[test]
    fn test_format_results() {
        let results = vec![SearchResult {
            title: "Job".to_string(),
            link: "https://jobs.lk".to_string(),
            snippet: "Great job".to_string(),
        }];
        let text = format_results("jobs", &results);
        assert!(text.starts_with("Search results for 'jobs'"));
        assert!(text.contains("1. Job\n   https://jobs.lk\n   Great job"));
        assert_eq!(format_results("x", &[]), "No results found for: x");
    }

    #[tokio::test]
    async fn test_missing_query_is_tool_error() {
        let client = SerperClient::new(&SearchConfig::default(), "key").unwrap();
        let tool = SearchTool::new(client);
        let result = tool.execute(&json!({})).await.unwrap();
        assert!(!result.success);
        assert_eq!(tool.to_definition().function.name, "search_internet");
    }
}
