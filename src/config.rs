//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CRM__*` 覆盖（双下划线表示嵌套，如 `CRM__LLM__MODEL=gpt-4o`）。
//! 命令行参数最后由 main 覆盖到加载结果上。

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::core::RetryPolicy;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub run: RunSection,
    pub llm: LlmSection,
    pub search: SearchSection,
    pub retry: RetrySection,
}

/// [run] 段：调研对象、维度、编排上限与阈值
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunSection {
    pub crms: Vec<String>,
    pub aspects: Vec<String>,
    pub max_iterations: u32,
    /// 校验平均分低于该值时回到 research
    pub validation_threshold: f64,
    /// 收敛窗口：最近 N 次决策相同即视为收敛
    pub convergence_window: usize,
    /// 置信度低于该值的 CRM 会在摘要末尾追加免责声明
    pub low_confidence_threshold: f64,
    pub output_dir: PathBuf,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            crms: vec!["HubSpot".into(), "Zoho".into(), "Salesforce".into()],
            aspects: default_aspects(),
            max_iterations: 10,
            validation_threshold: 0.8,
            convergence_window: 2,
            low_confidence_threshold: 0.4,
            output_dir: PathBuf::from("output"),
        }
    }
}

fn default_aspects() -> Vec<String> {
    vec![
        "pricing".into(),
        "features".into(),
        "integrations".into(),
        "limitations".into(),
    ]
}

/// [llm] 段：后端、模型与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 目前支持 openai（任意 OpenAI 兼容端点，配合 base_url）
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub base_url: Option<String>,
    /// 是否走 JSON Schema 结构化输出；false 时只用「文本 + 解析」路径
    pub structured_output: bool,
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            temperature: 0.3,
            base_url: None,
            structured_output: true,
            request_timeout_secs: 60,
        }
    }
}

/// [search] 段：搜索后端、结果条数、各维度查询模板
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub provider: String,
    pub endpoint: String,
    pub max_results: usize,
    pub timeout_secs: u64,
    /// 维度 -> 查询后缀；未配置的维度直接用维度名
    pub aspect_queries: HashMap<String, String>,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            provider: "tavily".into(),
            endpoint: "https://api.tavily.com/search".into(),
            max_results: 8,
            timeout_secs: 15,
            aspect_queries: default_aspect_queries(),
        }
    }
}

fn default_aspect_queries() -> HashMap<String, String> {
    [
        ("pricing", "pricing tiers 2025"),
        ("features", "key features 2025"),
        ("integrations", "integrations app marketplace 2025 Zapier Slack"),
        ("limitations", "limitations drawbacks cons 2025"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// [retry] 段：外部调用的重试次数与退避
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_retries: u32,
    pub delay_ms: u64,
    pub exponential_backoff: bool,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_ms: 1000,
            exponential_backoff: true,
        }
    }
}

impl RetrySection {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            base_delay: Duration::from_millis(self.delay_ms),
            exponential: self.exponential_backoff,
        }
    }
}

/// 从 config 目录加载配置，环境变量 CRM__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 CRM__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CRM")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.run.crms.len(), 3);
        assert_eq!(cfg.run.aspects, default_aspects());
        assert_eq!(cfg.run.max_iterations, 10);
        assert_eq!(cfg.run.convergence_window, 2);
        assert!((cfg.run.validation_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(cfg.search.max_results, 8);
        assert_eq!(cfg.retry.max_retries, 3);
        assert!(cfg.search.aspect_queries.contains_key("integrations"));
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[run]\ncrms = [\"Pipedrive\"]\nmax_iterations = 4\n\n[retry]\nexponential_backoff = false"
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.run.crms, vec!["Pipedrive".to_string()]);
        assert_eq!(cfg.run.max_iterations, 4);
        // 未出现的键保持默认
        assert_eq!(cfg.run.aspects.len(), 4);
        assert!(!cfg.retry.exponential_backoff);
        assert_eq!(cfg.retry.max_retries, 3);
    }

    #[test]
    fn test_retry_policy_from_section() {
        let section = RetrySection {
            max_retries: 5,
            delay_ms: 250,
            exponential_backoff: true,
        };
        let policy = section.policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
    }
}
