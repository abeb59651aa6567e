//! CRM 结构化数据模型
//!
//! 同一套类型既是 LLM 结构化输出的目标 Schema（schemars 生成），也是报告中 detailed_data 的序列化格式。

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// 接受整数或整值浮点数（如 5.0）的用户数上限；非整数或负数报错
fn deserialize_user_limit<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<f64>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if value.fract() != 0.0 || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(serde::de::Error::custom(format!(
            "user_limit must be a non-negative integer, got {value}"
        )));
    }
    Ok(Some(value as u32))
}

/// 定价档位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PricingTier {
    pub name: String,
    /// 月价（USD）
    #[serde(default)]
    pub monthly_price: Option<f64>,
    /// 年价（USD）
    #[serde(default)]
    pub annual_price: Option<f64>,
    /// 用户数上限
    #[serde(default, deserialize_with = "deserialize_user_limit")]
    #[schemars(with = "Option<u32>")]
    pub user_limit: Option<u32>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl PricingTier {
    pub fn monthly(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            monthly_price: Some(price),
            annual_price: None,
            user_limit: None,
            features: Vec::new(),
        }
    }
}

/// 功能清单：四个分类，不做去重
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeatureSet {
    #[serde(default)]
    pub core_features: Vec<String>,
    #[serde(default)]
    pub automation: Vec<String>,
    #[serde(default)]
    pub analytics: Vec<String>,
    #[serde(default)]
    pub customization: Vec<String>,
}

impl FeatureSet {
    pub fn categories(&self) -> [&Vec<String>; 4] {
        [
            &self.core_features,
            &self.automation,
            &self.analytics,
            &self.customization,
        ]
    }

    /// 非空分类数（0..=4）
    pub fn populated_categories(&self) -> usize {
        self.categories().iter().filter(|c| !c.is_empty()).count()
    }
}

/// 第三方集成
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Integration {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub native: bool,
}

impl Integration {
    /// 由关键词收割补充进来的集成
    pub fn third_party(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: "third-party".to_string(),
            native: false,
        }
    }
}

/// 单个 CRM 的调研结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CrmRecord {
    pub name: String,
    #[serde(default)]
    pub pricing_tiers: Vec<PricingTier>,
    #[serde(default)]
    pub features: FeatureSet,
    #[serde(default)]
    pub integrations: Vec<Integration>,
    #[serde(default)]
    pub limitations: Vec<String>,
    #[serde(default)]
    pub best_for: Vec<String>,
    /// 证据覆盖度估计，0..=1
    #[serde(default)]
    pub confidence_score: f64,
}

impl CrmRecord {
    /// 只有名字的占位记录（无搜索结果或解析失败时使用）
    pub fn stub(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            pricing_tiers: Vec::new(),
            features: FeatureSet::default(),
            integrations: Vec::new(),
            limitations: Vec::new(),
            best_for: Vec::new(),
            confidence_score: confidence,
        }
    }

    /// 反序列化之后的 Schema 约束检查
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(format!(
                "confidence_score {} outside [0, 1]",
                self.confidence_score
            ));
        }
        Ok(())
    }

    /// 有价格的档位中的最低月价
    pub fn min_monthly_price(&self) -> Option<f64> {
        self.pricing_tiers
            .iter()
            .filter_map(|t| t.monthly_price)
            .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.min(p))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_tolerates_missing_and_unknown_keys() {
        let raw = r#"{
            "name": "Zoho",
            "pricing_tiers": [{"name": "Standard", "monthly_price": 14, "notes": "per user"}],
            "integrations": [{"name": "Slack", "category": "chat", "notes": "native"}],
            "confidence_score": 0.4
        }"#;
        let record: CrmRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.pricing_tiers[0].monthly_price, Some(14.0));
        assert!(record.features.core_features.is_empty());
        assert!(!record.integrations[0].native);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_user_limit_accepts_integral_float() {
        let raw = r#"{"name": "Acme",
            "pricing_tiers": [{"name": "Team", "monthly_price": 10, "user_limit": 5.0},
                              {"name": "Solo", "user_limit": 1},
                              {"name": "Open", "user_limit": null}],
            "confidence_score": 0.5}"#;
        let record: CrmRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.pricing_tiers[0].user_limit, Some(5));
        assert_eq!(record.pricing_tiers[1].user_limit, Some(1));
        assert_eq!(record.pricing_tiers[2].user_limit, None);

        let fractional = r#"{"name": "Acme", "pricing_tiers": [{"name": "T", "user_limit": 2.5}]}"#;
        assert!(serde_json::from_str::<CrmRecord>(fractional).is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        let mut record = CrmRecord::stub("HubSpot", 1.5);
        assert!(record.validate().is_err());
        record.confidence_score = 0.5;
        assert!(record.validate().is_ok());
        record.name = "  ".into();
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_min_monthly_price_skips_unpriced_tiers() {
        let mut record = CrmRecord::stub("Salesforce", 0.5);
        assert_eq!(record.min_monthly_price(), None);
        record.pricing_tiers.push(PricingTier {
            name: "Custom".into(),
            monthly_price: None,
            annual_price: Some(1000.0),
            user_limit: None,
            features: vec![],
        });
        assert_eq!(record.min_monthly_price(), None);
        record.pricing_tiers.push(PricingTier::monthly("Pro", 80.0));
        record.pricing_tiers.push(PricingTier::monthly("Essentials", 25.0));
        assert_eq!(record.min_monthly_price(), Some(25.0));
    }
}
