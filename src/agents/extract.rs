//! 结构化抽取的纯函数部分
//!
//! LLM 输出修复（整体解析 / 花括号片段）、集成关键词收割、集成补充与归一化、证据覆盖度置信度。

use std::collections::HashSet;

use crate::models::{CrmRecord, Integration};

/// 关键词收割使用的固定集成词表（顺序即收割结果顺序）
pub const INTEGRATION_KEYWORDS: &[&str] = &[
    "Slack",
    "Zapier",
    "Mailchimp",
    "Stripe",
    "Segment",
    "Shopify",
    "QuickBooks",
    "Gmail",
    "Outlook",
    "Intercom",
    "Twilio",
    "Pabbly",
    "Calendly",
    "Typeform",
    "Salesforce",
    "Google Sheets",
    "Google Analytics",
    "Paddle",
    "Recurly",
    "Chargebee",
    "SyncSpider",
    "ThriveCart",
];

/// 文本路径要求的 JSON 结构说明
pub const STRUCTURE_GUIDE: &str = "Return ONLY a single JSON object with keys: name, \
pricing_tiers (list of objects with name, monthly_price, annual_price, user_limit, features), \
features (object with core_features, automation, analytics, customization), \
integrations (list with name, category, native), limitations (list of strings), \
best_for (list of strings), confidence_score (float 0-1). \
LIST every distinct integration/product/tool explicitly mentioned.";

/// 二次补充的触发条件与上限
const SPARSE_INTEGRATIONS: usize = 3;
const SECOND_PASS_TARGET: usize = 5;

/// 从任意文本中取出 JSON 对象片段：第一个 '{' 到最后一个 '}'，且左右括号数相等
pub fn extract_json_fragment(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    let fragment = &text[start..=end];
    let opens = fragment.matches('{').count();
    let closes = fragment.matches('}').count();
    (opens == closes).then_some(fragment)
}

fn parse_candidate(candidate: &str) -> Option<CrmRecord> {
    let record: CrmRecord = serde_json::from_str(candidate).ok()?;
    record.validate().ok()?;
    Some(record)
}

/// 依次尝试整体解析与片段解析，第一个能通过 Schema 校验的结果胜出
pub fn parse_record(content: &str) -> Option<CrmRecord> {
    if let Some(record) = parse_candidate(content.trim()) {
        return Some(record);
    }
    extract_json_fragment(content).and_then(parse_candidate)
}

/// 大小写不敏感地扫描词表，返回命中的集成名（词表顺序）
pub fn harvest_integrations(raw_text: &str) -> Vec<&'static str> {
    let lower = raw_text.to_lowercase();
    INTEGRATION_KEYWORDS
        .iter()
        .copied()
        .filter(|kw| lower.contains(&kw.to_lowercase()))
        .collect()
}

fn existing_names(record: &CrmRecord) -> HashSet<String> {
    record
        .integrations
        .iter()
        .map(|i| i.name.trim().to_lowercase())
        .collect()
}

fn bump_confidence(record: &mut CrmRecord, delta: f64) {
    let base = if record.confidence_score > 0.0 {
        record.confidence_score
    } else {
        0.3
    };
    record.confidence_score = (base + delta).min(1.0);
}

/// 把记录中尚未出现的收割结果追加为第三方集成；有新增时置信度 +0.1，返回新增数
pub fn merge_harvested(record: &mut CrmRecord, harvested: &[&str]) -> usize {
    let mut existing = existing_names(record);
    let mut added = 0;
    for kw in harvested {
        if existing.insert(kw.to_lowercase()) {
            record.integrations.push(Integration::third_party(*kw));
            added += 1;
        }
    }
    if added > 0 {
        bump_confidence(record, 0.1);
    }
    added
}

/// 集成过少（<3）而收割较多（>=3）时补到最多 5 个；有新增时置信度 +0.05，返回新增数
pub fn second_pass_enrich(record: &mut CrmRecord, harvested: &[&str]) -> usize {
    if record.integrations.len() >= SPARSE_INTEGRATIONS || harvested.len() < SPARSE_INTEGRATIONS {
        return 0;
    }
    let mut existing = existing_names(record);
    let mut added = 0;
    for kw in harvested {
        if record.integrations.len() >= SECOND_PASS_TARGET {
            break;
        }
        if existing.insert(kw.to_lowercase()) {
            record.integrations.push(Integration::third_party(*kw));
            added += 1;
        }
    }
    if added > 0 {
        bump_confidence(record, 0.05);
    }
    added
}

/// 去空白、大小写不敏感去重（先出现者保留）、两个已知名字的规范大小写
pub fn normalize_integrations(integrations: Vec<Integration>) -> Vec<Integration> {
    let mut seen = HashSet::new();
    integrations
        .into_iter()
        .filter_map(|mut integ| {
            let trimmed = integ.name.trim();
            if !seen.insert(trimmed.to_lowercase()) {
                return None;
            }
            integ.name = trimmed
                .replace("mailchimp", "Mailchimp")
                .replace("quickbooks", "QuickBooks");
            Some(integ)
        })
        .collect()
}

/// 证据覆盖度：0.15 基线 + 定价 0.15 + 功能分类覆盖 0.35 + 集成 0.25 + 限制 0.10，封顶 0.95，保留三位小数
pub fn compute_confidence(record: &CrmRecord) -> f64 {
    let pricing = if record.pricing_tiers.is_empty() { 0.0 } else { 1.0 };
    let feature_cov = record.features.populated_categories() as f64 / 4.0;
    let integ_cov = (record.integrations.len() as f64 / 15.0).min(1.0);
    let limitations = if record.limitations.is_empty() { 0.0 } else { 1.0 };

    let confidence =
        0.15 + 0.15 * pricing + 0.35 * feature_cov + 0.25 * integ_cov + 0.10 * limitations;
    (confidence.min(0.95) * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PricingTier;

    #[test]
    fn test_fragment_from_prose() {
        let text = "Sure! Here is the data:\n{\"name\": \"Zoho\", \"features\": {}}\nHope this helps.";
        assert_eq!(
            extract_json_fragment(text),
            Some("{\"name\": \"Zoho\", \"features\": {}}")
        );
    }

    #[test]
    fn test_fragment_rejects_unbalanced_or_missing() {
        assert_eq!(extract_json_fragment("no json here"), None);
        assert_eq!(extract_json_fragment("} backwards {"), None);
        assert_eq!(extract_json_fragment("{\"a\": {\"b\": 1}"), None);
    }

    #[test]
    fn test_parse_record_direct_then_fragment() {
        let direct = r#"{"name": "HubSpot", "confidence_score": 0.5}"#;
        assert_eq!(parse_record(direct).unwrap().name, "HubSpot");

        let wrapped = "```json\n{\"name\": \"Zoho\", \"limitations\": [\"UI\"]}\n```";
        let record = parse_record(wrapped).unwrap();
        assert_eq!(record.name, "Zoho");
        assert_eq!(record.limitations, vec!["UI".to_string()]);
    }

    #[test]
    fn test_parse_record_rejects_schema_violations() {
        assert!(parse_record(r#"{"name": "X", "confidence_score": 3.0}"#).is_none());
        assert!(parse_record(r#"{"pricing_tiers": []}"#).is_none());
        assert!(parse_record("I could not find anything.").is_none());
    }

    #[test]
    fn test_parse_record_accepts_float_user_limit() {
        let raw = r#"{"name":"Acme","pricing_tiers":[{"name":"Team","monthly_price":10,"user_limit":5.0}],"confidence_score":0.5}"#;
        let record = parse_record(raw).unwrap();
        assert_eq!(record.pricing_tiers[0].user_limit, Some(5));
    }

    #[test]
    fn test_harvest_is_case_insensitive_and_ordered() {
        let found = harvest_integrations("Works with SLACK, google sheets and zapier.");
        assert_eq!(found, vec!["Slack", "Zapier", "Google Sheets"]);
        assert!(harvest_integrations("nothing relevant").is_empty());
    }

    #[test]
    fn test_merge_harvested_skips_existing_and_bumps_confidence() {
        let mut record = CrmRecord::stub("HubSpot", 0.0);
        record.integrations.push(Integration::third_party("slack"));
        let added = merge_harvested(&mut record, &["Slack", "Zapier"]);
        assert_eq!(added, 1);
        assert_eq!(record.integrations.len(), 2);
        assert!((record.confidence_score - 0.4).abs() < 1e-9);

        let before = record.confidence_score;
        assert_eq!(merge_harvested(&mut record, &["Zapier"]), 0);
        assert_eq!(record.confidence_score, before);
    }

    #[test]
    fn test_second_pass_caps_at_five() {
        let mut record = CrmRecord::stub("Zoho", 0.5);
        record.integrations.push(Integration::third_party("Custom API"));
        let harvested = ["Slack", "Zapier", "Mailchimp", "Stripe", "Segment", "Shopify"];
        let added = second_pass_enrich(&mut record, &harvested);
        assert_eq!(added, 4);
        assert_eq!(record.integrations.len(), 5);
        assert!((record.confidence_score - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_second_pass_needs_sparse_record_and_rich_harvest() {
        let mut record = CrmRecord::stub("Zoho", 0.5);
        assert_eq!(second_pass_enrich(&mut record, &["Slack", "Zapier"]), 0);
        for n in ["A", "B", "C"] {
            record.integrations.push(Integration::third_party(n));
        }
        assert_eq!(second_pass_enrich(&mut record, &["Slack", "Zapier", "Stripe"]), 0);
    }

    #[test]
    fn test_normalize_dedupes_and_canonicalizes() {
        let input = vec![
            Integration::third_party(" mailchimp "),
            Integration::third_party("Mailchimp"),
            Integration::third_party("quickbooks online"),
            Integration::third_party("Slack"),
            Integration::third_party("SLACK"),
        ];
        let out = normalize_integrations(input);
        let names: Vec<_> = out.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Mailchimp", "QuickBooks online", "Slack"]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let input = vec![
            Integration::third_party("quickbooks"),
            Integration::third_party("Zapier "),
            Integration::third_party("zapier"),
            Integration::third_party("mailchimp"),
        ];
        let once = normalize_integrations(input);
        let twice = normalize_integrations(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_confidence_caps_at_095() {
        let mut record = CrmRecord::stub("Salesforce", 0.0);
        record.pricing_tiers.push(PricingTier::monthly("Essentials", 25.0));
        record.features.core_features.push("Leads".into());
        record.features.automation.push("Flows".into());
        record.features.analytics.push("Reports".into());
        record.features.customization.push("Objects".into());
        for i in 0..16 {
            record.integrations.push(Integration::third_party(format!("App{i}")));
        }
        record.limitations.push("Steep learning curve".into());
        assert_eq!(compute_confidence(&record), 0.95);
    }

    #[test]
    fn test_confidence_partial_evidence() {
        let mut record = CrmRecord::stub("Zoho", 0.9);
        assert_eq!(compute_confidence(&record), 0.15);
        record.features.core_features.push("Leads".into());
        record.integrations.push(Integration::third_party("Slack"));
        // 0.15 + 0.35 * 0.25 + 0.25 / 15 = 0.25417
        assert_eq!(compute_confidence(&record), 0.254);
    }
}
