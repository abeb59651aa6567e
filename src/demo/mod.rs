//! 离线演示：内置 HubSpot / Zoho / Salesforce 的搜索片段，以及从片段直接推导记录的模拟抽取器
//!
//! 不访问任何外部 API；评分、推荐、校验与主控循环都走真实实现。

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::llm::{ExtractionRequest, LlmError, MockLlmClient, StructuredExtractor};
use crate::models::{CrmRecord, FeatureSet, Integration, PricingTier};
use crate::tools::{MockSearchProvider, Snippet};

pub const DEMO_CRMS: [&str; 3] = ["HubSpot", "Zoho", "Salesforce"];

/// 非 --fast 模式下每次搜索的人为延迟
pub const DEMO_SEARCH_DELAY: Duration = Duration::from_millis(100);

/// (对象, 维度, [(标题, 内容)])
const DEMO_DATA: &[(&str, &str, &[(&str, &str)])] = &[
    ("HubSpot", "pricing", &[
        ("HubSpot Pricing", "Free tier available. Starter: $20/month per user. Professional: $890/month for 5 users. Enterprise: $3600/month."),
        ("HubSpot for Small Business", "Best for companies under 50 employees. Free CRM includes contact management, deals, tasks."),
    ]),
    ("HubSpot", "features", &[
        ("HubSpot Features", "Email marketing, live chat, forms, email scheduling, meeting scheduling, quotes, conversational bots, reporting dashboard"),
        ("HubSpot Automation", "Workflow automation, lead scoring, email sequences, task automation"),
    ]),
    ("HubSpot", "integrations", &[
        ("HubSpot Integrations", "Native: Slack, Gmail, Outlook, Zoom, Shopify, WordPress. 1000+ apps via marketplace"),
    ]),
    ("HubSpot", "limitations", &[
        ("HubSpot Limitations", "Free tier limited to 1M contacts. No custom reporting in Starter. API rate limits: 100 calls/10 seconds"),
    ]),
    ("Zoho", "pricing", &[
        ("Zoho CRM Pricing", "Free for 3 users. Standard: $14/user/month. Professional: $23/user/month. Enterprise: $40/user/month"),
        ("Zoho B2B Features", "Affordable for SMBs. Annual billing saves 20%. Includes Zia AI assistant"),
    ]),
    ("Zoho", "features", &[
        ("Zoho Features", "Lead management, deal tracking, contact management, workflow automation, analytics, AI predictions"),
        ("Zoho Advanced", "Territory management, advanced CRM analytics, multiple pipelines, custom modules"),
    ]),
    ("Zoho", "integrations", &[
        ("Zoho Integrations", "Native Zoho suite integration. Connects with Office 365, G Suite, Slack, Mailchimp. 300+ integrations"),
    ]),
    ("Zoho", "limitations", &[
        ("Zoho Limitations", "Complex UI for beginners. Limited customization in lower tiers. No phone support in Standard plan"),
    ]),
    ("Salesforce", "pricing", &[
        ("Salesforce Pricing", "Essentials: $25/user/month. Professional: $80/user/month. Enterprise: $165/user/month. Unlimited: $330/user/month"),
        ("Salesforce for SMB", "Minimum 10 users for Enterprise. Best ROI for 50+ user companies"),
    ]),
    ("Salesforce", "features", &[
        ("Salesforce Features", "Lead & opportunity management, account management, contact management, email integration, customizable reports & dashboards"),
        ("Salesforce Platform", "Process automation, approval processes, Einstein AI, mobile app, custom apps, API access"),
    ]),
    ("Salesforce", "integrations", &[
        ("Salesforce AppExchange", "4000+ apps available. Native: Slack (owned), Tableau, Mulesoft. Deep integration capabilities"),
    ]),
    ("Salesforce", "limitations", &[
        ("Salesforce Limitations", "Steep learning curve. Expensive for small teams. Requires admin resources. Storage limits per user"),
    ]),
];

/// 预置全部演示数据的搜索后端
pub fn mock_search_provider(delay: Duration) -> MockSearchProvider {
    DEMO_DATA
        .iter()
        .fold(MockSearchProvider::new(), |provider, (crm, aspect, items)| {
            let snippets = items
                .iter()
                .map(|(title, content)| Snippet::new(*title, *content))
                .collect();
            provider.with(crm, aspect, snippets)
        })
        .with_delay(delay)
}

/// 分析阶段使用的固定摘要
pub fn summary_client() -> MockLlmClient {
    MockLlmClient::fixed(format!(
        "Demo summary generated {} (offline mode).",
        chrono::Local::now().to_rfc3339()
    ))
}

/// 限制类语句的提示词
const LIMITATION_CUES: [&str; 7] = [
    "limit", "no ", "steep", "expensive", "complex", "requires", "lack",
];

fn price_re() -> &'static Regex {
    static PRICE_RE: OnceLock<Regex> = OnceLock::new();
    PRICE_RE.get_or_init(|| Regex::new(r"([A-Z][A-Za-z]+):\s*\$(\d+(?:\.\d+)?)").unwrap())
}

fn native_list_re() -> &'static Regex {
    static NATIVE_RE: OnceLock<Regex> = OnceLock::new();
    NATIVE_RE.get_or_init(|| Regex::new(r"(Native:|Connects with)\s*([^.]+)").unwrap())
}

fn is_limitation(text: &str) -> bool {
    let lower = text.to_lowercase();
    LIMITATION_CUES.iter().any(|cue| lower.contains(cue))
}

/// "Starter: $20" 形式的价格；出现 "Free" 时补一个 0 元档位。同名档位只保留第一个
pub fn extract_pricing(text: &str) -> Vec<PricingTier> {
    let mut tiers: Vec<PricingTier> = Vec::new();
    if text.split(|c: char| !c.is_alphanumeric()).any(|w| w == "Free") {
        tiers.push(PricingTier::monthly("Free", 0.0));
    }
    for cap in price_re().captures_iter(text) {
        let Ok(price) = cap[2].parse::<f64>() else {
            continue;
        };
        if tiers.iter().any(|t| t.name == cap[1]) {
            continue;
        }
        tiers.push(PricingTier::monthly(&cap[1], price));
    }
    tiers
}

/// 按关键词把短语归入四个功能分类
pub fn extract_features(text: &str) -> FeatureSet {
    let mut features = FeatureSet::default();
    let phrases = text
        .split(|c: char| matches!(c, ',' | '.' | ';' | ':' | '\n'))
        .flat_map(|p| p.split(" includes "))
        .map(str::trim)
        .filter(|p| !p.is_empty() && p.split_whitespace().count() <= 5)
        .filter(|p| !p.contains('$') && !is_limitation(p));

    for phrase in phrases {
        let lower = phrase.to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();
        let bucket = if ["automation", "workflow", "sequences", "scoring", "approval"]
            .iter()
            .any(|k| lower.contains(k))
        {
            &mut features.automation
        } else if ["report", "analytics", "dashboard", "predictions"]
            .iter()
            .any(|k| lower.contains(k))
            || words.contains(&"ai")
        {
            &mut features.analytics
        } else if lower.contains("custom") || lower.contains("territory") {
            &mut features.customization
        } else if [
            "management", "tracking", "email", "chat", "scheduling", "forms", "quotes", "bots",
            "mobile", "pipelines",
        ]
        .iter()
        .any(|k| lower.contains(k))
            || words.contains(&"api")
        {
            &mut features.core_features
        } else {
            continue;
        };
        if !bucket.iter().any(|f| f.eq_ignore_ascii_case(phrase)) {
            bucket.push(phrase.to_string());
        }
    }
    features
}

/// "Native: A, B" 与 "Connects with A, B" 列表中的集成
pub fn extract_integrations(text: &str) -> Vec<Integration> {
    let mut integrations: Vec<Integration> = Vec::new();
    for cap in native_list_re().captures_iter(text) {
        let native = &cap[1] == "Native:";
        for item in cap[2].split(',') {
            let name = item.split('(').next().unwrap_or(item).trim();
            if name.is_empty() || integrations.iter().any(|i| i.name == name) {
                continue;
            }
            integrations.push(Integration {
                name: name.to_string(),
                category: if native { "native" } else { "connector" }.to_string(),
                native,
            });
        }
    }
    integrations
}

/// 含限制类提示词的句子
pub fn extract_limitations(text: &str) -> Vec<String> {
    text.split(['.', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty() && is_limitation(s))
        .map(str::to_string)
        .collect()
}

/// 不调用模型、直接从片段推导记录的结构化抽取器
#[derive(Debug, Default)]
pub struct SimulatedExtractor;

#[async_trait]
impl StructuredExtractor for SimulatedExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<CrmRecord, LlmError> {
        let text = request
            .snippets
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if text.trim().is_empty() {
            return Err(LlmError::Schema(format!(
                "no evidence for {}",
                request.crm_name
            )));
        }

        Ok(CrmRecord {
            name: request.crm_name.clone(),
            pricing_tiers: extract_pricing(&text),
            features: extract_features(&text),
            integrations: extract_integrations(&text),
            limitations: extract_limitations(&text),
            best_for: vec!["SMB".to_string(), "B2B".to_string()],
            confidence_score: 0.9,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::SearchProvider;

    fn all_text(crm: &str) -> String {
        DEMO_DATA
            .iter()
            .filter(|(c, _, _)| *c == crm)
            .flat_map(|(_, _, items)| items.iter().map(|(_, content)| *content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_pricing_from_hubspot_snippets() {
        let tiers = extract_pricing(&all_text("HubSpot"));
        let names: Vec<&str> = tiers.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Free", "Starter", "Professional", "Enterprise"]);
        assert_eq!(tiers[0].monthly_price, Some(0.0));
        assert_eq!(tiers[1].monthly_price, Some(20.0));
    }

    #[test]
    fn test_salesforce_has_no_free_tier() {
        let tiers = extract_pricing(&all_text("Salesforce"));
        assert_eq!(tiers[0].name, "Essentials");
        assert_eq!(tiers[0].monthly_price, Some(25.0));
    }

    #[test]
    fn test_feature_buckets() {
        let f = extract_features(&all_text("Zoho"));
        assert!(f.core_features.contains(&"Lead management".to_string()));
        assert!(f.automation.contains(&"workflow automation".to_string()));
        assert!(f.analytics.contains(&"AI predictions".to_string()));
        assert!(f.customization.contains(&"custom modules".to_string()));
        // 限制类语句不会被当作功能
        assert!(!f.customization.iter().any(|c| c.contains("Limited")));
    }

    #[test]
    fn test_native_lists() {
        let ints = extract_integrations(&all_text("Salesforce"));
        let names: Vec<&str> = ints.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Slack", "Tableau", "Mulesoft"]);
        assert!(ints.iter().all(|i| i.native));

        let zoho = extract_integrations(&all_text("Zoho"));
        assert!(zoho.iter().any(|i| i.name == "Mailchimp" && !i.native));
    }

    #[test]
    fn test_limitations_by_sentence() {
        let l = extract_limitations(&all_text("Salesforce"));
        assert!(l.contains(&"Steep learning curve".to_string()));
        assert!(l.contains(&"Storage limits per user".to_string()));
    }

    #[tokio::test]
    async fn test_mock_provider_serves_every_aspect() {
        let provider = mock_search_provider(Duration::ZERO);
        for crm in DEMO_CRMS {
            for aspect in ["pricing", "features", "integrations", "limitations"] {
                assert!(!provider.search(crm, aspect).await.unwrap().is_empty());
            }
        }
    }

    #[tokio::test]
    async fn test_simulated_extractor_rejects_empty_evidence() {
        let request = ExtractionRequest {
            crm_name: "Pipedrive".into(),
            snippets: vec![],
            prompt: String::new(),
        };
        assert!(SimulatedExtractor.extract(&request).await.is_err());
    }
}
