//! CRM Scout 命令行入口
//!
//! 加载 .env 与配置、应用命令行覆盖、初始化日志，运行工作流并写出 JSON 报告。

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use crm_scout::core::retry_blocking;
use crm_scout::{load_config, observability, report, WorkflowBuilder};

#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-agent CRM research and comparison")]
struct Args {
    /// 待比较的 CRM
    #[arg(long, num_args = 1..)]
    crms: Option<Vec<String>>,
    /// 调研维度
    #[arg(long, num_args = 1..)]
    aspects: Option<Vec<String>>,
    #[arg(long)]
    max_iterations: Option<u32>,
    /// 模型名（覆盖 llm.model）
    #[arg(long)]
    model: Option<String>,
    /// 运行标识，默认取当前时间
    #[arg(long)]
    run_id: Option<String>,
    /// 控制台日志级别
    #[arg(long, default_value = "INFO")]
    log_level: String,
    /// 额外的 TOML 配置文件
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let mut cfg = load_config(args.config.clone()).context("Failed to load config")?;
    if let Some(crms) = args.crms {
        cfg.run.crms = crms;
    }
    if let Some(aspects) = args.aspects {
        cfg.run.aspects = aspects;
    }
    if let Some(max) = args.max_iterations {
        cfg.run.max_iterations = max;
    }
    if let Some(model) = args.model {
        cfg.llm.model = model;
    }

    let run_id = args
        .run_id
        .unwrap_or_else(|| chrono::Local::now().format("%Y%m%d_%H%M%S").to_string());
    let output_dir = cfg.run.output_dir.clone();
    let retry = cfg.retry.policy();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output dir {}", output_dir.display()))?;
    observability::init(&args.log_level, Some(&report::log_path(&output_dir, &run_id)))?;

    tracing::info!(run_id = %run_id, crms = ?cfg.run.crms, aspects = ?cfg.run.aspects, "starting CRM research");

    let builder = WorkflowBuilder::from_config(cfg).context("Failed to create workflow")?;
    let llm = builder.llm();
    let state = builder.initial_state(&run_id);
    let workflow = builder.build();
    let state = workflow.run(state).await;

    let (prompt_tokens, completion_tokens, total_tokens) = llm.token_usage();
    tracing::info!(prompt_tokens, completion_tokens, total_tokens, "token usage");

    for entry in &state.error_log {
        tracing::warn!(source = %entry.source, subject = %entry.subject, error = %entry.error, "error during run");
    }

    let Some(comparison) = state.final_comparison.as_ref() else {
        tracing::warn!("run finished without a comparison");
        return Ok(());
    };

    println!("\nSUMMARY:\n{}", comparison.summary);
    println!("\nRECOMMENDATIONS:\n{}", report::format_recommendations(&comparison.recommendations));

    let path = retry_blocking(&retry, "write_report", || {
        report::write_report(&output_dir, &run_id, comparison)
    })
    .context("Failed to write report")?;
    println!("\nReport saved to {}", path.display());
    Ok(())
}
