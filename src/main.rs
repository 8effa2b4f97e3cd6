//! assetlift CLI entry point.

mod cli;
mod ui;

use anyhow::Context;
use assetlift::services::config::PipelineSettings;
use assetlift::services::pipeline::{PreflightHook, ProgressReporter};
use assetlift::{Pipeline, PipelineRequest, RunOutcome};
use clap::Parser;
use cli::Cli;
use futures_util::FutureExt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use ui::{prompts, RunProgress, UiContext};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut settings = PipelineSettings::load_or_default(cli.config.as_deref())
        .context("loading configuration")?;
    if let Some(root) = &cli.scratch_root {
        settings.scratch_root = Some(root.clone());
    }

    let request = PipelineRequest {
        input: cli.input.clone(),
        output: cli.output_path(),
        kind: cli.kind(),
    };

    let ui = UiContext::detect().with_auto_yes(cli.yes);
    let pipeline = Pipeline::new(settings)?
        .with_preflight(confirm_overwrite(ui.clone(), request.output.clone()));
    let progress = Arc::new(RunProgress::new(&ui));

    let cancel = pipeline.cancel_flag();
    let notices = Arc::clone(&progress);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            notices.notice("Cancelling after the current batch...");
            cancel.cancel();
        }
    });

    let result = pipeline
        .run(&request, ProgressReporter::new(progress.clone()))
        .await;
    progress.finish();
    let leftover = pipeline.shutdown();
    if leftover > 0 {
        log::debug!("Removed {leftover} tracked scratch paths on exit");
    }

    let outcome = result.with_context(|| format!("extracting {}", request.input.display()))?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome);
    }
    Ok(())
}

/// `RUST_LOG` applies unless `-v` is given.
fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_module("assetlift", log::LevelFilter::Info);
        }
        _ => {
            builder.filter_module("assetlift", log::LevelFilter::Debug);
        }
    }
    builder.format_timestamp(None).init();
}

fn print_summary(outcome: &RunOutcome) {
    let artifact = &outcome.artifact;
    println!("Output:    {}", artifact.output_path.display());
    println!("Kind:      {}", artifact.kind.name());
    println!("Framework: {}", artifact.framework.name());
    println!(
        "Files:     {} ({} bytes, {} reorganized)",
        artifact.file_count, artifact.byte_size, outcome.reorganized.file_count
    );
    if outcome.reorganized.synthesized_entry {
        println!("Entry:     synthesized index.html");
    }
}

/// Ask before replacing an existing output. Nothing is asked when the
/// destination does not exist yet.
fn confirm_overwrite(ui: UiContext, output: PathBuf) -> PreflightHook {
    Arc::new(move || {
        let ui = ui.clone();
        let output = output.clone();
        async move {
            if !output.exists() {
                return true;
            }
            let message = format!("{} exists and will be replaced. Continue?", output.display());
            match prompts::confirm(&ui, &message, false).await {
                Ok(answer) => answer,
                Err(e) => {
                    log::warn!("Overwrite confirmation failed: {e:#}");
                    false
                }
            }
        }
        .boxed()
    })
}
