//! `shortsmith` command-line binary.

mod cli;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use shortsmith_media::{check_ffmpeg, check_ffprobe, probe_video};
use shortsmith_models::{RenderStatus, RunSummary};
use shortsmith_pipeline::{init_tracing, Pipeline, PipelineConfig};

use cli::{Cli, Commands, RunArgs};

/// Some segments failed or were skipped.
const EXIT_PARTIAL: i32 = 2;
/// The run never reached rendering.
const EXIT_FATAL: i32 = 1;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let code = match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}

async fn execute(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Probe { source } => {
            check_ffprobe()?;
            let video = probe_video(&source).await?;
            println!("{}", serde_json::to_string_pretty(&video)?);
            Ok(0)
        }
        Commands::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> anyhow::Result<i32> {
    check_ffmpeg()?;
    check_ffprobe()?;

    let mut config = PipelineConfig::from_env();
    args.apply_to(&mut config);
    let plan_request = args.plan_request(config.min_clip_length).await?;
    let reframe = args.reframe_config();
    info!(
        plan = plan_request.as_str(),
        ratio = %reframe.target_ratio,
        mode = reframe.mode.as_str(),
        jobs = config.max_parallel_renders,
        "Starting shortsmith"
    );

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, no further clips will start");
            let _ = cancel_tx.send(true);
        }
    });

    let pipeline = Pipeline::new(config);
    let summary = pipeline
        .run_with_cancel(&args.source, &plan_request, &args.output_dir, &reframe, cancel_rx)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if summary.total_failed == 0 && summary.total_skipped == 0 {
        Ok(0)
    } else {
        Ok(EXIT_PARTIAL)
    }
}

fn print_summary(summary: &RunSummary) {
    for result in &summary.results {
        match result.status {
            RenderStatus::Success => println!(
                "ok       {}  {}  ({:.1}s)",
                result.segment,
                result.output_path.display(),
                result.elapsed_ms as f64 / 1000.0
            ),
            RenderStatus::Failed => println!(
                "failed   {}  {}",
                result.segment,
                result.error_detail.as_deref().unwrap_or("unknown error")
            ),
            RenderStatus::Skipped => println!("skipped  {}", result.segment),
        }
    }
    for rejection in &summary.rejected {
        println!(
            "rejected request {} [{:.3}s - {:.3}s]: {}",
            rejection.request_index, rejection.start, rejection.end, rejection.reason
        );
    }
    println!(
        "{} of {} requested clips written{}",
        summary.total_succeeded,
        summary.total_requested,
        if summary.cancelled { " (cancelled)" } else { "" }
    );
}
