//! CRM Scout - 多智能体 CRM 调研对比系统
//!
//! 模块划分：
//! - **agents**: 调研（并发搜索 + 结构化抽取）、分析（打分 + 摘要）、校验
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 运行状态、主控决策、工作流循环、错误与重试
//! - **demo**: 离线演示数据与模拟抽取器
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **models**: CRM 结构化数据模型
//! - **observability**: 控制台 + 文件日志
//! - **report**: JSON 报告落盘
//! - **tools**: 搜索后端（Tavily / Mock）与完整度校验工具

pub mod agents;
pub mod config;
pub mod core;
pub mod demo;
pub mod llm;
pub mod models;
pub mod observability;
pub mod report;
pub mod tools;

pub use crate::config::{load_config, AppConfig};
pub use crate::core::{RunState, Workflow, WorkflowBuilder};
pub use crate::models::CrmRecord;
