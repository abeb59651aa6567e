//! 校验 Agent：完整度评分 + 语义检查，结果只作提示，不会中断运行
//!
//! 平均分低于阈值时，把得分不达标的 CRM 标记为待重新调研。

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::core::{RunState, ValidationReport};
use crate::models::CrmRecord;
use crate::tools::ValidationTool;

/// 两个 CRM 核心功能重合比例超过该值视为可疑（可能是幻觉）
const OVERLAP_RATIO: f64 = 0.8;

/// 语义检查：核心功能高度重合、负价格
pub fn semantic_issues(records: &BTreeMap<String, CrmRecord>) -> Vec<String> {
    let mut issues = Vec::new();

    let mut seen: Vec<(&str, HashSet<&str>)> = Vec::new();
    for (name, record) in records {
        let feats: HashSet<&str> = record
            .features
            .core_features
            .iter()
            .map(String::as_str)
            .collect();
        for (other, other_feats) in &seen {
            let overlap = feats.intersection(other_feats).count();
            if overlap > 0 && overlap as f64 > OVERLAP_RATIO * feats.len() as f64 {
                issues.push(format!("Suspicious feature overlap between {name} and {other}"));
            }
        }
        seen.push((name.as_str(), feats));
    }

    // 每个负价档位各报一次
    for (name, record) in records {
        for tier in &record.pricing_tiers {
            if tier.monthly_price.is_some_and(|p| p < 0.0) {
                issues.push(format!("Invalid negative pricing for {name}"));
            }
        }
    }
    issues
}

pub struct ValidatorAgent {
    tool: Arc<dyn ValidationTool>,
    threshold: f64,
}

impl ValidatorAgent {
    pub fn new(tool: Arc<dyn ValidationTool>, threshold: f64) -> Self {
        Self { tool, threshold }
    }

    pub async fn run(&self, mut state: RunState) -> RunState {
        let report = ValidationReport {
            completeness: self.tool.check(&state.records),
            semantic_issues: semantic_issues(&state.records),
        };
        let mean = report.mean_score();
        for issue in &report.semantic_issues {
            tracing::warn!(issue = %issue, "semantic validation");
        }
        tracing::info!(mean, threshold = self.threshold, "validation complete");

        if mean < self.threshold {
            for (crm, entry) in &report.completeness {
                if entry.score < self.threshold {
                    tracing::info!(crm = %crm, score = entry.score, issues = ?entry.issues, "marking for re-research");
                    state.research_status.insert(crm.clone(), false);
                }
            }
        }
        state.validation_results.push(report);
        state
    }
}
