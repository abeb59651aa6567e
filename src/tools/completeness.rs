//! 完整度校验工具
//!
//! 定价档位、核心功能、集成、限制四项各占 25 分，归一化到 0..=1；满分即 complete。

use std::collections::BTreeMap;

use crate::core::{CompletenessEntry, CompletenessReport};
use crate::models::CrmRecord;

/// 校验协作方：记录集合 -> 完整度报告
pub trait ValidationTool: Send + Sync {
    fn check(&self, records: &BTreeMap<String, CrmRecord>) -> CompletenessReport;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CompletenessTool;

impl CompletenessTool {
    pub fn score_record(record: &CrmRecord) -> CompletenessEntry {
        let checks = [
            (!record.pricing_tiers.is_empty(), "Missing pricing information"),
            (
                !record.features.core_features.is_empty(),
                "Missing feature details",
            ),
            (!record.integrations.is_empty(), "Missing integration data"),
            (!record.limitations.is_empty(), "Missing limitations"),
        ];

        let mut points = 0u32;
        let mut issues = Vec::new();
        for (present, issue) in checks {
            if present {
                points += 25;
            } else {
                issues.push(issue.to_string());
            }
        }

        CompletenessEntry {
            score: f64::from(points) / 100.0,
            issues,
            complete: points == 100,
        }
    }
}

impl ValidationTool for CompletenessTool {
    fn check(&self, records: &BTreeMap<String, CrmRecord>) -> CompletenessReport {
        records
            .iter()
            .map(|(name, record)| (name.clone(), Self::score_record(record)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Integration, PricingTier};

    #[test]
    fn test_empty_record_scores_zero_with_four_issues() {
        let entry = CompletenessTool::score_record(&CrmRecord::stub("Zoho", 0.1));
        assert_eq!(entry.score, 0.0);
        assert_eq!(entry.issues.len(), 4);
        assert!(!entry.complete);
    }

    #[test]
    fn test_full_record_is_complete() {
        let mut record = CrmRecord::stub("HubSpot", 0.9);
        record.pricing_tiers.push(PricingTier::monthly("Starter", 20.0));
        record.features.core_features.push("Contacts".into());
        record.integrations.push(Integration::third_party("Slack"));
        record.limitations.push("API limits".into());
        let entry = CompletenessTool::score_record(&record);
        assert_eq!(entry.score, 1.0);
        assert!(entry.issues.is_empty());
        assert!(entry.complete);
    }

    #[test]
    fn test_check_covers_every_record() {
        let mut records = BTreeMap::new();
        let mut partial = CrmRecord::stub("A", 0.5);
        partial.limitations.push("slow".into());
        records.insert("A".to_string(), partial);
        records.insert("B".to_string(), CrmRecord::stub("B", 0.5));
        let report = CompletenessTool.check(&records);
        assert_eq!(report.len(), 2);
        assert_eq!(report["A"].score, 0.25);
        assert_eq!(report["A"].issues, vec![
            "Missing pricing information".to_string(),
            "Missing feature details".to_string(),
            "Missing integration data".to_string(),
        ]);
    }
}
