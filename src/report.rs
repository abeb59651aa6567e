//! 运行产物：JSON 报告与日志文件路径

use std::path::{Path, PathBuf};

use crate::core::{CrmError, FinalComparison, Recommendations};

pub fn report_path(dir: &Path, run_id: &str) -> PathBuf {
    dir.join(format!("crm_report_{run_id}.json"))
}

pub fn log_path(dir: &Path, run_id: &str) -> PathBuf {
    dir.join(format!("crm_run_{run_id}.log"))
}

/// 写出最终对比报告（缩进 JSON），返回文件路径
pub fn write_report(
    dir: &Path,
    run_id: &str,
    comparison: &FinalComparison,
) -> Result<PathBuf, CrmError> {
    std::fs::create_dir_all(dir)?;
    let path = report_path(dir, run_id);
    let json = serde_json::to_string_pretty(comparison)?;
    std::fs::write(&path, json)?;
    tracing::info!(path = %path.display(), "report written");
    Ok(path)
}

/// 控制台展示用的推荐列表，每行一个维度；缺失的维度不输出
pub fn format_recommendations(recs: &Recommendations) -> String {
    [
        ("Best Overall", &recs.best_overall),
        ("Best Value", &recs.best_value),
        ("Most Features", &recs.most_features),
        ("Best Integrations", &recs.best_integrations),
    ]
    .iter()
    .filter_map(|(label, name)| name.as_ref().map(|n| format!("  - {label}: {n}")))
    .collect::<Vec<_>>()
    .join("\n")
}
