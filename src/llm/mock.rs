//! Mock LLM 客户端（用于测试与离线演示，无需 API）
//!
//! 按顺序吐出预设回复；预设用完后返回固定的默认回复。同时记录收到的最后一条消息，便于断言 prompt 内容。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{ExtractionRequest, LlmClient, LlmError, Message, StructuredExtractor};
use crate::models::CrmRecord;

/// Mock 文本客户端
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: String,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockLlmClient {
    /// 每次都返回同一段文本
    pub fn fixed(reply: impl Into<String>) -> Self {
        Self {
            fallback: reply.into(),
            ..Self::default()
        }
    }

    /// 依次返回 script 中的结果
    pub fn scripted(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 最近一次调用中最后一条消息的内容
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = messages.last().map(|m| m.content.clone());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// Mock 结构化抽取：按 CRM 名返回预设记录，未预设的名字返回 Schema 错误
#[derive(Debug, Default)]
pub struct MockStructuredExtractor {
    records: Vec<CrmRecord>,
    calls: AtomicUsize,
}

impl MockStructuredExtractor {
    pub fn new(records: Vec<CrmRecord>) -> Self {
        Self {
            records,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StructuredExtractor for MockStructuredExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<CrmRecord, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.records
            .iter()
            .find(|r| r.name == request.crm_name)
            .cloned()
            .ok_or_else(|| LlmError::Schema(format!("no record for {}", request.crm_name)))
    }
}
