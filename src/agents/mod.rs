//! 各阶段 Agent：调研（搜索 + 抽取）、分析（打分 + 摘要）、校验

pub mod analysis;
pub mod extract;
pub mod research;
pub mod validator;

pub use analysis::{calculate_scores, generate_recommendations, AnalysisAgent};
pub use extract::{compute_confidence, normalize_integrations, INTEGRATION_KEYWORDS};
pub use research::{ExtractionMode, ResearchAgent};
pub use validator::{semantic_issues, ValidatorAgent};
