//! 核心编排层：错误与重试、运行状态、主控决策、工作流循环与装配

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod state;
pub mod workflow;

pub use builder::WorkflowBuilder;
pub use error::CrmError;
pub use orchestrator::Orchestrator;
pub use retry::{retry_async, retry_blocking, RetryPolicy};
pub use state::{
    CompletenessEntry, CompletenessReport, ErrorEntry, FinalComparison, Recommendations, RunState,
    Scores, Task, ValidationReport,
};
pub use workflow::Workflow;
