//! Workflow 构建器：统一的组件装配逻辑
//!
//! CLI 使用真实的 Tavily + OpenAI 后端（from_config）；测试与离线演示注入 Mock 后端。

use std::sync::Arc;

use crate::agents::{AnalysisAgent, ExtractionMode, ResearchAgent, ValidatorAgent};
use crate::config::AppConfig;
use crate::core::{CrmError, Orchestrator, RunState, Workflow};
use crate::llm::{LlmClient, OpenAiClient, RetryingLlmClient, StructuredExtractor};
use crate::tools::{CompletenessTool, SearchProvider, TavilySearchProvider, ValidationTool};

/// Workflow 构建器：配置 + 各协作方
pub struct WorkflowBuilder {
    config: AppConfig,
    search: Arc<dyn SearchProvider>,
    llm: Arc<dyn LlmClient>,
    structured: Option<Arc<dyn StructuredExtractor>>,
    validation_tool: Arc<dyn ValidationTool>,
}

impl WorkflowBuilder {
    /// 以给定的搜索与 LLM 后端创建；默认只用文本解析路径
    pub fn new(config: AppConfig, search: Arc<dyn SearchProvider>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            config,
            search,
            llm,
            structured: None,
            validation_tool: Arc::new(CompletenessTool),
        }
    }

    /// 按配置创建真实后端（Tavily 搜索 + OpenAI 兼容 LLM）
    pub fn from_config(config: AppConfig) -> Result<Self, CrmError> {
        if config.search.provider != "tavily" {
            return Err(CrmError::Config(format!(
                "Unknown search provider: {}",
                config.search.provider
            )));
        }
        if config.llm.provider != "openai" {
            return Err(CrmError::Config(format!(
                "Unknown LLM provider: {}",
                config.llm.provider
            )));
        }

        let search = Arc::new(TavilySearchProvider::from_env(&config.search)?);
        let client = Arc::new(OpenAiClient::from_config(&config.llm)?);
        tracing::info!(model = %config.llm.model, structured = config.llm.structured_output, "llm backend ready");

        let structured_output = config.llm.structured_output;
        let mut builder = Self::new(config, search, client.clone());
        if structured_output {
            builder = builder.with_structured(client);
        }
        Ok(builder)
    }

    /// 启用结构化抽取
    pub fn with_structured(mut self, extractor: Arc<dyn StructuredExtractor>) -> Self {
        self.structured = Some(extractor);
        self
    }

    /// 替换完整度校验工具
    pub fn with_validation_tool(mut self, tool: Arc<dyn ValidationTool>) -> Self {
        self.validation_tool = tool;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 未包装重试的 LLM 客户端（用于运行结束后读取 token 统计）
    pub fn llm(&self) -> Arc<dyn LlmClient> {
        self.llm.clone()
    }

    /// 调研目标描述（写入 RunState.objective）
    pub fn objective(&self) -> String {
        format!(
            "Compare {} focusing on {} for small B2B.",
            self.config.run.crms.join(", "),
            self.config.run.aspects.join(", ")
        )
    }

    pub fn initial_state(&self, run_id: impl Into<String>) -> RunState {
        RunState::new(run_id, self.objective())
    }

    pub fn build(self) -> Workflow {
        let run = &self.config.run;
        let retry = self.config.retry.policy();
        let llm: Arc<dyn LlmClient> = Arc::new(RetryingLlmClient::new(self.llm, retry.clone()));

        let mode = match self.structured {
            Some(extractor) => ExtractionMode::Structured(extractor),
            None => ExtractionMode::TextParse,
        };

        Workflow::new(
            Orchestrator::from_config(&self.config),
            ResearchAgent::new(
                self.search,
                llm.clone(),
                mode,
                run.crms.clone(),
                run.aspects.clone(),
                retry,
            ),
            AnalysisAgent::new(llm, run.low_confidence_threshold),
            ValidatorAgent::new(self.validation_tool, run.validation_threshold),
        )
    }
}
