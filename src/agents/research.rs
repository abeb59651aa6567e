//! 调研 Agent：按维度并发搜索，再把片段抽取为结构化 CrmRecord
//!
//! 单个 CRM 的流程：并发搜索各维度（单维度失败只记日志）→ 关键词收割 → 结构化抽取（可回退到文本解析）
//! → 补充集成 → 归一化 → 重新计算置信度。收割结果只在文本解析成功时整体并入；
//! 其余路径（结构化结果、占位记录）只经过补到 5 个为止的第二轮补充。多个 CRM 之间同样并发，任一失败只写入 error_log。

use std::sync::Arc;

use futures_util::future::join_all;

use crate::agents::extract::{
    compute_confidence, harvest_integrations, merge_harvested, normalize_integrations,
    parse_record, second_pass_enrich, STRUCTURE_GUIDE,
};
use crate::core::{retry_async, CrmError, ErrorEntry, RetryPolicy, RunState};
use crate::llm::{ExtractionRequest, LlmClient, Message, StructuredExtractor};
use crate::models::CrmRecord;
use crate::tools::{SearchProvider, Snippet};

/// 没有任何搜索结果时的占位置信度
const NO_EVIDENCE_CONFIDENCE: f64 = 0.1;
/// 文本解析彻底失败时的占位置信度
const PARSE_FAILURE_CONFIDENCE: f64 = 0.2;

/// 抽取方式：构造时由调用方决定
#[derive(Clone)]
pub enum ExtractionMode {
    /// 先走结构化抽取，失败再回退到文本解析
    Structured(Arc<dyn StructuredExtractor>),
    /// 只用「要求输出 JSON + 修复解析」
    TextParse,
}

pub struct ResearchAgent {
    search: Arc<dyn SearchProvider>,
    llm: Arc<dyn LlmClient>,
    mode: ExtractionMode,
    crms: Vec<String>,
    aspects: Vec<String>,
    retry: RetryPolicy,
}

impl ResearchAgent {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        llm: Arc<dyn LlmClient>,
        mode: ExtractionMode,
        crms: Vec<String>,
        aspects: Vec<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            search,
            llm,
            mode,
            crms,
            aspects,
            retry,
        }
    }

    /// 调研所有尚未完成的 CRM，结果并入状态
    pub async fn run(&self, mut state: RunState) -> RunState {
        let pending: Vec<&String> = self
            .crms
            .iter()
            .filter(|c| !state.is_researched(c))
            .collect();

        if !pending.is_empty() {
            tracing::info!(pending = ?pending, "research started");
            let results = join_all(pending.iter().map(|crm| self.research_crm(crm))).await;
            for (crm, result) in pending.into_iter().zip(results) {
                match result {
                    Ok(record) => {
                        state.records.insert(crm.clone(), record);
                        state.research_status.insert(crm.clone(), true);
                    }
                    Err(e) => {
                        tracing::error!(crm = %crm, error = %e, "research failed");
                        state.log_error(ErrorEntry::now("research", crm, &e));
                    }
                }
            }
        }

        tracing::info!(records = state.records.len(), "research complete");
        state
    }

    /// 并发搜索该 CRM 的全部维度；失败的维度被排除
    async fn gather_snippets(&self, crm: &str) -> Vec<Snippet> {
        let searches = self.aspects.iter().map(|aspect| {
            let label = format!("search:{crm}:{aspect}");
            async move {
                let result =
                    retry_async(&self.retry, &label, || self.search.search(crm, aspect)).await;
                (aspect, result)
            }
        });

        let mut collected = Vec::new();
        for (aspect, result) in join_all(searches).await {
            match result {
                Ok(snippets) => {
                    tracing::debug!(crm, aspect = %aspect, count = snippets.len(), "search ok");
                    collected.extend(snippets);
                }
                Err(e) => tracing::error!(crm, aspect = %aspect, error = %e, "search error"),
            }
        }
        collected
    }

    /// 单个 CRM 的完整调研流程
    pub async fn research_crm(&self, crm: &str) -> Result<CrmRecord, CrmError> {
        let snippets = self.gather_snippets(crm).await;
        if snippets.is_empty() {
            tracing::warn!(crm, "no snippets returned, skipping extraction");
            return Ok(CrmRecord::stub(crm, NO_EVIDENCE_CONFIDENCE));
        }

        let raw_text = snippets
            .iter()
            .map(|s| format!("{}\n{}", s.title, s.content))
            .collect::<Vec<_>>()
            .join("\n");
        let harvested = harvest_integrations(&raw_text);
        if !harvested.is_empty() {
            tracing::debug!(crm, harvested = ?harvested, "harvested integration candidates");
        }

        let mut record = self.extract(crm, snippets, &harvested).await?;
        // 记录以调研对象名为准
        record.name = crm.to_string();

        let added = second_pass_enrich(&mut record, &harvested);
        if added > 0 {
            tracing::debug!(crm, added, "post-pass added integrations");
        }

        let before = record.integrations.len();
        record.integrations = normalize_integrations(std::mem::take(&mut record.integrations));
        if before != record.integrations.len() {
            tracing::debug!(crm, before, after = record.integrations.len(), "deduped integrations");
        }

        record.confidence_score = compute_confidence(&record);
        tracing::debug!(
            crm,
            pricing = !record.pricing_tiers.is_empty(),
            feature_categories = record.features.populated_categories(),
            integrations = record.integrations.len(),
            limitations = !record.limitations.is_empty(),
            confidence = record.confidence_score,
            "confidence components"
        );
        Ok(record)
    }

    async fn extract(
        &self,
        crm: &str,
        snippets: Vec<Snippet>,
        harvested: &[&str],
    ) -> Result<CrmRecord, CrmError> {
        let raw = serde_json::to_string(&snippets)?;
        if let ExtractionMode::Structured(extractor) = &self.mode {
            let request = ExtractionRequest {
                crm_name: crm.to_string(),
                prompt: structured_prompt(crm, &raw),
                snippets,
            };
            match extractor.extract(&request).await {
                Ok(record) => return Ok(record),
                Err(e) => tracing::warn!(crm, error = %e, "structured extraction failed, falling back"),
            }
        }
        self.extract_from_text(crm, &raw, harvested).await
    }

    /// 文本路径：要求只输出 JSON，解析成功后并入收割结果；解析失败则返回低置信度占位记录
    async fn extract_from_text(
        &self,
        crm: &str,
        raw: &str,
        harvested: &[&str],
    ) -> Result<CrmRecord, CrmError> {
        let messages = [Message::system(text_prompt(crm, raw))];
        let content = self.llm.complete(&messages).await?;
        match parse_record(&content) {
            Some(mut record) => {
                let merged = merge_harvested(&mut record, harvested);
                if merged > 0 {
                    tracing::debug!(crm, merged, "merged harvested integrations");
                }
                Ok(record)
            }
            None => {
                tracing::error!(crm, "parse failure: could not extract valid JSON");
                Ok(CrmRecord::stub(crm, PARSE_FAILURE_CONFIDENCE))
            }
        }
    }
}

fn structured_prompt(crm: &str, raw: &str) -> String {
    format!(
        "Extract structured CRM data for '{crm}'. If information is missing, leave lists empty \
         and set confidence_score <= 0.3.\nList each distinct integration/product/tool explicitly; \
         do NOT hallucinate beyond snippets.\nSnippets: {raw}"
    )
}

fn text_prompt(crm: &str, raw: &str) -> String {
    format!(
        "You are a data extraction tool. Using ONLY the provided raw snippets, build a structured \
         JSON object for CRM '{crm}'.\nIf a field is unknown, use an empty list or sensible default \
         (confidence_score <= 0.3).\nLIST EVERY DISTINCT INTEGRATION NAME (tools, platforms, apps) \
         mentioned.\nRAW_SNIPPETS: {raw}\n{STRUCTURE_GUIDE}\nSTRICT: Output ONLY JSON with no commentary."
    )
}
