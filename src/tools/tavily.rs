//! Tavily 搜索后端
//!
//! POST {endpoint}，Bearer 鉴权；请求体含 query 与 max_results，返回 results[{title, url, content}]。

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::SearchSection;
use crate::tools::search::{build_query, clean_content, SearchError, SearchProvider, Snippet};

const PLACEHOLDER_KEYS: &[&str] = &[
    "your_tavily_key_here",
    "your_tavily_api_key_here",
    "changeme",
    "placeholder",
];

/// 单条片段正文上限
const MAX_SNIPPET_CHARS: usize = 4000;

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: String,
}

pub struct TavilySearchProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    max_results: usize,
    aspect_queries: HashMap<String, String>,
}

/// 拒绝空 Key 与常见占位符
fn check_api_key(key: &str) -> Result<(), SearchError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(SearchError::Config("TAVILY_API_KEY not set".to_string()));
    }
    if trimmed.starts_with('<') || PLACEHOLDER_KEYS.contains(&trimmed.to_lowercase().as_str()) {
        return Err(SearchError::Config(
            "TAVILY_API_KEY appears to be a placeholder".to_string(),
        ));
    }
    Ok(())
}

impl TavilySearchProvider {
    pub fn new(section: &SearchSection, api_key: String) -> Result<Self, SearchError> {
        check_api_key(&api_key)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(section.timeout_secs))
            .build()
            .map_err(|e| SearchError::Config(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: section.endpoint.clone(),
            api_key: api_key.trim().to_string(),
            max_results: section.max_results,
            aspect_queries: section.aspect_queries.clone(),
        })
    }

    /// 从环境变量 TAVILY_API_KEY 创建
    pub fn from_env(section: &SearchSection) -> Result<Self, SearchError> {
        let key = std::env::var("TAVILY_API_KEY").unwrap_or_default();
        Self::new(section, key)
    }
}

#[async_trait]
impl SearchProvider for TavilySearchProvider {
    async fn search(&self, subject: &str, aspect: &str) -> Result<Vec<Snippet>, SearchError> {
        let query = build_query(subject, aspect, &self.aspect_queries);
        let start = Instant::now();
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&TavilyRequest {
                query: &query,
                max_results: self.max_results,
            })
            .send()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(SearchError::Status(resp.status().as_u16()));
        }
        let body: TavilyResponse = resp
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        let snippets: Vec<Snippet> = body
            .results
            .into_iter()
            .take(self.max_results)
            .map(|r| Snippet {
                title: r.title,
                content: clean_content(&r.content, MAX_SNIPPET_CHARS),
                url: r.url,
            })
            .collect();

        let top_titles: Vec<&str> = snippets.iter().take(3).map(|s| s.title.as_str()).collect();
        tracing::debug!(
            query = %query,
            elapsed_ms = start.elapsed().as_millis() as u64,
            count = snippets.len(),
            top_titles = ?top_titles,
            "tavily search"
        );
        if snippets.is_empty() {
            tracing::warn!(query = %query, "tavily returned no results");
        }
        Ok(snippets)
    }
}
