//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）。
//! 结构化抽取把 schemars 生成的 CrmRecord Schema 注入 system prompt，并严格按 Schema 反序列化回复。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use schemars::schema_for;

use crate::config::LlmSection;
use crate::core::CrmError;
use crate::llm::{ExtractionRequest, LlmClient, LlmError, Message, Role, StructuredExtractor};
use crate::models::CrmRecord;

/// 这些值视为未配置的占位 Key
const PLACEHOLDER_KEYS: &[&str] = &["your_openai_key_here", "changeme", "placeholder", "sk-placeholder"];

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// OpenAI 兼容客户端：持有 Client、模型名与温度
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    /// 单次请求超时
    timeout: Duration,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: &str, temperature: f32) -> Self {
        let config = match base_url {
            Some(url) => OpenAIConfig::new().with_api_base(url).with_api_key(api_key),
            None => OpenAIConfig::new().with_api_key(api_key),
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature,
            timeout: Duration::from_secs(60),
            usage: TokenUsage::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 从 [llm] 配置与 OPENAI_API_KEY 创建；缺 Key 或 Key 为占位符时报错
    pub fn from_config(section: &LlmSection) -> Result<Self, CrmError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| CrmError::Config("OPENAI_API_KEY not set".to_string()))?;
        let trimmed = api_key.trim();
        if trimmed.is_empty()
            || trimmed.starts_with('<')
            || PLACEHOLDER_KEYS.contains(&trimmed.to_lowercase().as_str())
        {
            return Err(CrmError::Config(
                "OPENAI_API_KEY appears to be a placeholder".to_string(),
            ));
        }
        let prefix: String = trimmed.chars().take(5).collect();
        tracing::debug!(key_prefix = %prefix, model = %section.model, "using OpenAI-compatible LLM");
        Ok(Self::new(
            section.base_url.as_deref(),
            &section.model,
            trimmed,
            section.temperature,
        )
        .with_timeout(Duration::from_secs(section.request_timeout_secs)))
    }

    fn to_openai_messages(
        &self,
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        messages
            .iter()
            .map(|m| {
                let built = match m.role {
                    Role::System => ChatCompletionRequestSystemMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map(ChatCompletionRequestMessage::System),
                    Role::User => ChatCompletionRequestUserMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map(ChatCompletionRequestMessage::User),
                    Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map(ChatCompletionRequestMessage::Assistant),
                };
                built.map_err(|e| LlmError::Request(e.to_string()))
            })
            .collect()
    }
}

/// CrmRecord 的 JSON Schema 文本
pub fn crm_record_schema_json() -> String {
    let schema = schema_for!(CrmRecord);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .messages(self.to_openai_messages(messages)?)
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| LlmError::Request(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl StructuredExtractor for OpenAiClient {
    async fn extract(&self, request: &ExtractionRequest) -> Result<CrmRecord, LlmError> {
        let system = format!(
            "Reply with exactly one JSON object that validates against this JSON Schema. \
             No markdown, no commentary.\n{}",
            crm_record_schema_json()
        );
        let messages = [Message::system(system), Message::user(request.prompt.clone())];
        let content = self.complete(&messages).await?;
        let record: CrmRecord = serde_json::from_str(content.trim())
            .map_err(|e| LlmError::Schema(e.to_string()))?;
        record.validate().map_err(LlmError::Schema)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_names_record_fields() {
        let schema = crm_record_schema_json();
        for key in ["pricing_tiers", "core_features", "integrations", "confidence_score"] {
            assert!(schema.contains(key), "schema missing {key}");
        }
    }

    #[test]
    fn test_message_conversion_keeps_order() {
        let client = OpenAiClient::new(None, "gpt-4o-mini", "sk-test", 0.3);
        let converted = client
            .to_openai_messages(&[Message::system("s"), Message::user("u"), Message::assistant("a")])
            .unwrap();
        assert_eq!(converted.len(), 3);
        assert!(matches!(converted[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(converted[2], ChatCompletionRequestMessage::Assistant(_)));
    }
}
