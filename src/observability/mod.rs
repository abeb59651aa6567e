//! 可观测性：控制台日志 + 每次运行的调试日志文件
//!
//! 控制台按给定级别（可被 RUST_LOG 覆盖）输出 `[LEVEL] msg` 风格的简洁行；
//! 日志文件记录 DEBUG 及以上的全部事件，不带 ANSI 颜色。

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::Context;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 解析日志级别名，兼容 WARNING / CRITICAL 这类常见写法；不认识的名字报错
pub fn parse_level(level: &str) -> anyhow::Result<LevelFilter> {
    let normalized = match level.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    };
    LevelFilter::from_str(&normalized).map_err(|_| anyhow::anyhow!("Invalid log level: {level}"))
}

/// 控制台过滤器：优先 RUST_LOG，否则用给定级别
fn console_filter(level: &str) -> anyhow::Result<EnvFilter> {
    if std::env::var("RUST_LOG").is_ok() {
        return Ok(EnvFilter::from_default_env());
    }
    let level = parse_level(level)?;
    Ok(EnvFilter::new(level.to_string()))
}

fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log dir {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// 初始化全局 subscriber；只能调用一次
pub fn init(console_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let console = fmt::layer()
        .without_time()
        .with_target(false)
        .with_filter(console_filter(console_level)?);

    let file_layer = match log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}
