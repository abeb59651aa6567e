//! LLM 客户端抽象
//!
//! 两种能力分开建模：LlmClient 只做文本补全；StructuredExtractor 直接产出校验过的 CrmRecord。
//! 调研 Agent 在构造时由调用方选定抽取方式，运行时不做能力探测。

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::{retry_async, RetryPolicy};
use crate::llm::Message;
use crate::models::CrmRecord;
use crate::tools::Snippet;

/// LLM 调用错误
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Empty response")]
    EmptyResponse,

    /// 结构化输出无法解析为目标 Schema
    #[error("Schema mismatch: {0}")]
    Schema(String),
}

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 一次结构化抽取的输入：CRM 名、原始片段，以及已拼好的 prompt
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub crm_name: String,
    pub snippets: Vec<Snippet>,
    pub prompt: String,
}

/// 结构化抽取：直接得到 CrmRecord
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest) -> Result<CrmRecord, LlmError>;
}

/// 带重试的 LLM 客户端装饰器
pub struct RetryingLlmClient {
    inner: Arc<dyn LlmClient>,
    policy: RetryPolicy,
}

impl RetryingLlmClient {
    pub fn new(inner: Arc<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl LlmClient for RetryingLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        retry_async(&self.policy, "llm.complete", || self.inner.complete(messages)).await
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.inner.token_usage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use std::time::Duration;

    #[tokio::test]
    async fn test_retrying_client_recovers_from_transient_error() {
        let mock = Arc::new(MockLlmClient::scripted(vec![
            Err(LlmError::Request("429 Too Many Requests".into())),
            Ok("summary".to_string()),
        ]));
        let client = RetryingLlmClient::new(
            mock.clone(),
            RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                exponential: false,
            },
        );
        let out = client.complete(&[Message::user("hi")]).await.unwrap();
        assert_eq!(out, "summary");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_retrying_client_gives_up() {
        let mock = Arc::new(MockLlmClient::scripted(vec![
            Err(LlmError::Request("down".into())),
            Err(LlmError::Request("still down".into())),
        ]));
        let client = RetryingLlmClient::new(mock.clone(), RetryPolicy::none());
        let err = client.complete(&[Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, LlmError::Request(_)));
        assert_eq!(mock.call_count(), 1);
    }
}
