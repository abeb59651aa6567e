//! LLM 层：消息、客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

pub use message::{Message, Role};
pub use mock::{MockLlmClient, MockStructuredExtractor};
pub use openai::{crm_record_schema_json, OpenAiClient, TokenUsage};
pub use traits::{ExtractionRequest, LlmClient, LlmError, RetryingLlmClient, StructuredExtractor};
