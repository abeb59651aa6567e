//! 离线演示：使用内置搜索数据与模拟抽取器跑完整工作流，无需任何 API Key

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crm_scout::demo::{self, SimulatedExtractor, DEMO_CRMS, DEMO_SEARCH_DELAY};
use crm_scout::{observability, report, AppConfig, WorkflowBuilder};

#[derive(Parser, Debug)]
#[command(author, version, about = "Offline CRM multi-agent demo")]
struct Args {
    /// 跳过人为延迟
    #[arg(long)]
    fast: bool,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long, default_value = "INFO")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    observability::init(&args.log_level, None)?;

    let mut cfg = AppConfig::default();
    cfg.run.crms = DEMO_CRMS.iter().map(|s| s.to_string()).collect();
    let output_dir = cfg.run.output_dir.clone();
    let run_id = args
        .run_id
        .unwrap_or_else(|| format!("demo_{}", chrono::Local::now().format("%Y%m%d_%H%M%S")));

    let delay = if args.fast { Duration::ZERO } else { DEMO_SEARCH_DELAY };
    let builder = WorkflowBuilder::new(
        cfg,
        Arc::new(demo::mock_search_provider(delay)),
        Arc::new(demo::summary_client()),
    )
    .with_structured(Arc::new(SimulatedExtractor));

    println!("Multi-Agent CRM Research System Demo (offline mock mode)\n");
    let state = builder.initial_state(&run_id);
    let state = builder.build().run(state).await;

    let Some(comparison) = state.final_comparison.as_ref() else {
        println!("Demo finished without a comparison.");
        return Ok(());
    };

    println!("SCORES:");
    for (name, s) in &comparison.scores {
        println!(
            "  {name:<12} overall {:.2}  pricing {:.2}  features {:.2}  integrations {:.2}",
            s.overall, s.pricing, s.features, s.integrations
        );
    }
    println!("\nRECOMMENDATIONS:\n{}", report::format_recommendations(&comparison.recommendations));
    println!("\nSUMMARY:\n{}", comparison.summary);

    let path = report::write_report(&output_dir, &run_id, comparison)
        .context("Failed to write report")?;
    println!("\nReport saved to {}\nDemo complete.", path.display());
    Ok(())
}
