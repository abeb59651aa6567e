//! 运行期错误类型
//!
//! 调研失败按 CRM 记入 RunState.error_log，不会中断整个运行；只有启动阶段（配置、密钥、输出目录）的错误会返回给 main。

use thiserror::Error;

use crate::llm::LlmError;
use crate::tools::SearchError;

/// 编排与各 Agent 可能出现的错误（搜索、LLM、解析、配置、IO）
#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CrmError {
    fn from(e: serde_json::Error) -> Self {
        CrmError::JsonParse(e.to_string())
    }
}

impl From<config::ConfigError> for CrmError {
    fn from(e: config::ConfigError) -> Self {
        CrmError::Config(e.to_string())
    }
}
