//! 分析 Agent：确定性打分、按维度推荐，并请 LLM 写执行摘要
//!
//! 打分只依赖记录本身；摘要调用失败时改用根据得分生成的摘要，并把失败写入 error_log。

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::{ErrorEntry, FinalComparison, Recommendations, RunState, Scores};
use crate::llm::{LlmClient, Message};
use crate::models::CrmRecord;

/// 无定价信息时视为的价格（得分 0）
const UNPRICED: f64 = 100.0;

/// 单个 CRM 的得分
pub fn score_record(record: &CrmRecord) -> Scores {
    let min_price = record.min_monthly_price().unwrap_or(UNPRICED);
    let pricing = (100.0 - min_price).max(0.0) / 100.0;

    let f = &record.features;
    let feature_count = f.core_features.len() + f.automation.len() + f.analytics.len();
    let features = (feature_count as f64 / 20.0).min(1.0);

    let integrations = (record.integrations.len() as f64 / 15.0).min(1.0);
    let overall = pricing * 0.3 + features * 0.4 + integrations * 0.3;

    Scores {
        pricing,
        features,
        integrations,
        overall,
    }
}

pub fn calculate_scores(records: &BTreeMap<String, CrmRecord>) -> BTreeMap<String, Scores> {
    records
        .iter()
        .map(|(name, record)| (name.clone(), score_record(record)))
        .collect()
}

/// 按迭代顺序取最大值，并列时先出现者胜
fn argmax(scores: &BTreeMap<String, Scores>, key: impl Fn(&Scores) -> f64) -> Option<String> {
    let mut best: Option<(&String, f64)> = None;
    for (name, s) in scores {
        let v = key(s);
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((name, v)),
        }
    }
    best.map(|(name, _)| name.clone())
}

pub fn generate_recommendations(scores: &BTreeMap<String, Scores>) -> Recommendations {
    Recommendations {
        best_overall: argmax(scores, |s| s.overall),
        best_value: argmax(scores, |s| s.pricing),
        most_features: argmax(scores, |s| s.features),
        best_integrations: argmax(scores, |s| s.integrations),
    }
}

/// LLM 不可用时的摘要
fn fallback_summary(scores: &BTreeMap<String, Scores>, recs: &Recommendations) -> String {
    let mut lines = vec!["Automated comparison based on collected evidence.".to_string()];
    for (name, s) in scores {
        lines.push(format!(
            "{name}: overall {:.2} (pricing {:.2}, features {:.2}, integrations {:.2}).",
            s.overall, s.pricing, s.features, s.integrations
        ));
    }
    if let Some(best) = &recs.best_overall {
        lines.push(format!("Best overall fit: {best}."));
    }
    lines.join(" ")
}

/// 置信度低于阈值的 CRM 的免责声明；没有时为空串
pub fn low_confidence_disclaimer(records: &BTreeMap<String, CrmRecord>, threshold: f64) -> String {
    let low: Vec<&str> = records
        .iter()
        .filter(|(_, r)| r.confidence_score < threshold)
        .map(|(name, _)| name.as_str())
        .collect();
    if low.is_empty() {
        return String::new();
    }
    format!(
        "\n\nDisclaimer: Data for {} may be incomplete; treat related comparisons cautiously.",
        low.join(", ")
    )
}

pub struct AnalysisAgent {
    llm: Arc<dyn LlmClient>,
    low_confidence_threshold: f64,
}

impl AnalysisAgent {
    pub fn new(llm: Arc<dyn LlmClient>, low_confidence_threshold: f64) -> Self {
        Self {
            llm,
            low_confidence_threshold,
        }
    }

    fn summary_prompt(
        objective: &str,
        scores: &BTreeMap<String, Scores>,
        records: &BTreeMap<String, CrmRecord>,
    ) -> String {
        format!(
            "Create a concise executive summary comparing these CRMs.\nRequest: {objective}\n\
             Scores: {}\nData: {}\n\
             Focus on key differentiators and practical recommendations. Keep under 300 words.",
            serde_json::to_string_pretty(scores).unwrap_or_default(),
            serde_json::to_string_pretty(records).unwrap_or_default(),
        )
    }

    pub async fn run(&self, mut state: RunState) -> RunState {
        for (name, record) in &state.records {
            tracing::debug!(
                crm = %name,
                integrations = record.integrations.len(),
                confidence = record.confidence_score,
                "analysis input"
            );
        }

        let scores = calculate_scores(&state.records);
        let recommendations = generate_recommendations(&scores);

        let prompt = Self::summary_prompt(&state.objective, &scores, &state.records);
        let summary = match self.llm.complete(&[Message::system(prompt)]).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "summary generation failed, using fallback");
                state.log_error(ErrorEntry::now("analysis", "summary", &e));
                fallback_summary(&scores, &recommendations)
            }
        };
        let disclaimer = low_confidence_disclaimer(&state.records, self.low_confidence_threshold);

        state.final_comparison = Some(FinalComparison {
            summary: summary + &disclaimer,
            scores,
            recommendations,
            detailed_data: state.records.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
        tracing::info!("analysis complete");
        state
    }
}
