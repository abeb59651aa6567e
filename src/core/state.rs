//! 运行状态：一次运行只有一个 RunState，由编排循环按值传给各阶段再收回
//!
//! records 使用按名字排序的 BTreeMap，推荐结果的并列判定因此是确定的（字典序靠前者胜）。

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::CrmRecord;

/// 编排器可选的下一步
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Research,
    Analyze,
    Validate,
    Complete,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Research => "research",
            Task::Analyze => "analyze",
            Task::Validate => "validate",
            Task::Complete => "complete",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 错误日志条目：某个阶段在某个对象上失败
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntry {
    pub timestamp: String,
    pub source: String,
    pub error: String,
    pub subject: String,
}

impl ErrorEntry {
    pub fn now(source: &str, subject: &str, error: impl fmt::Display) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            source: source.to_string(),
            error: error.to_string(),
            subject: subject.to_string(),
        }
    }
}

/// 单个 CRM 的完整度评分
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletenessEntry {
    pub score: f64,
    pub issues: Vec<String>,
    pub complete: bool,
}

pub type CompletenessReport = BTreeMap<String, CompletenessEntry>;

/// 一次校验的结果
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub completeness: CompletenessReport,
    pub semantic_issues: Vec<String>,
}

impl ValidationReport {
    /// 各 CRM 完整度的平均分；没有条目时为 0
    pub fn mean_score(&self) -> f64 {
        if self.completeness.is_empty() {
            return 0.0;
        }
        self.completeness.values().map(|e| e.score).sum::<f64>() / self.completeness.len() as f64
    }
}

/// 单个 CRM 的各维度得分
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scores {
    pub pricing: f64,
    pub features: f64,
    pub integrations: f64,
    pub overall: f64,
}

/// 各维度的最佳 CRM；没有任何得分时全部为空，序列化为 {}
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recommendations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_overall: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_features: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_integrations: Option<String>,
}

/// 分析阶段产物，也是落盘报告的内容
#[derive(Debug, Clone, Serialize)]
pub struct FinalComparison {
    pub summary: String,
    pub scores: BTreeMap<String, Scores>,
    pub recommendations: Recommendations,
    pub detailed_data: BTreeMap<String, CrmRecord>,
    pub timestamp: String,
}

/// 一次运行的全部状态
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    pub run_id: String,
    /// 自然语言的调研目标，拼入分析 prompt
    pub objective: String,
    pub records: BTreeMap<String, CrmRecord>,
    pub research_status: HashMap<String, bool>,
    pub validation_results: Vec<ValidationReport>,
    pub final_comparison: Option<FinalComparison>,
    /// None 表示尚未做出第一次决策
    pub current_task: Option<Task>,
    pub iteration_count: u32,
    pub error_log: Vec<ErrorEntry>,
    pub convergence_history: VecDeque<Task>,
}

impl RunState {
    pub fn new(run_id: impl Into<String>, objective: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            objective: objective.into(),
            records: BTreeMap::new(),
            research_status: HashMap::new(),
            validation_results: Vec::new(),
            final_comparison: None,
            current_task: None,
            iteration_count: 0,
            error_log: Vec::new(),
            convergence_history: VecDeque::new(),
        }
    }

    pub fn is_researched(&self, crm: &str) -> bool {
        self.research_status.get(crm).copied().unwrap_or(false)
    }

    pub fn log_error(&mut self, entry: ErrorEntry) {
        self.error_log.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(score: f64) -> CompletenessEntry {
        CompletenessEntry {
            score,
            issues: vec![],
            complete: score >= 1.0,
        }
    }

    #[test]
    fn test_mean_score() {
        let mut completeness = CompletenessReport::new();
        completeness.insert("A".into(), entry(1.0));
        completeness.insert("B".into(), entry(0.5));
        let report = ValidationReport {
            completeness,
            semantic_issues: vec![],
        };
        assert!((report.mean_score() - 0.75).abs() < 1e-9);

        let empty = ValidationReport {
            completeness: CompletenessReport::new(),
            semantic_issues: vec![],
        };
        assert_eq!(empty.mean_score(), 0.0);
    }

    #[test]
    fn test_empty_recommendations_serialize_as_empty_object() {
        let json = serde_json::to_value(Recommendations::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn test_task_labels() {
        assert_eq!(Task::Research.to_string(), "research");
        assert_eq!(serde_json::to_value(Task::Complete).unwrap(), "complete");
    }
}
