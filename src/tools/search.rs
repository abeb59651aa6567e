//! 搜索协作方抽象：(对象, 维度) -> 有序片段列表
//!
//! 片段正文若像 HTML，则用 html2text 提取可读文本（失败时退回简易去标签），并截断到 max_chars。

use std::collections::HashMap;

use async_trait::async_trait;
use html2text::from_read;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 一条搜索结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Snippet {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            url: None,
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum SearchError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Search config error: {0}")]
    Config(String),
}

/// 搜索后端 trait
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, subject: &str, aspect: &str) -> Result<Vec<Snippet>, SearchError>;
}

/// 按维度模板拼查询串；未配置模板的维度直接使用维度名
pub fn build_query(subject: &str, aspect: &str, templates: &HashMap<String, String>) -> String {
    let suffix = templates.get(aspect).map(String::as_str).unwrap_or(aspect);
    format!("{subject} CRM {suffix} small business B2B")
}

/// 简易去除 HTML 标签（html2text 失败时的回退）
fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 判断内容是否像 HTML（需提取可读文本）
fn looks_like_html(s: &str) -> bool {
    let s = s.trim_start();
    s.starts_with("<!")
        || s.starts_with("<html")
        || s.starts_with("<HTML")
        || (s.contains('<') && (s.contains("</") || s.contains("<br") || s.contains("<p>")))
}

/// 清洗片段正文：HTML 转文本，超长截断
pub fn clean_content(raw: &str, max_chars: usize) -> String {
    let body = raw.trim_start_matches('\u{FEFF}');
    let text = if looks_like_html(body) {
        match from_read(body.as_bytes(), 120) {
            Ok(text) if !text.trim().is_empty() => text,
            _ => strip_html_tags(body),
        }
    } else {
        body.to_string()
    };
    let text = text.trim();
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect::<String>() + "...[truncated]"
    } else {
        text.to_string()
    }
}
