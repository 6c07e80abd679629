//! `run` command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use contracts::{format_duration, RuntimeBlueprint};
use scheduler::StopSignal;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(tick_interval) = args.tick_interval {
        info!(
            tick_interval = %format_duration(tick_interval),
            "Overriding dispatcher tick interval from CLI"
        );
        blueprint.dispatcher.tick_interval = tick_interval;
    }

    info!(
        feeds = blueprint.feeds.len(),
        tick_interval = %format_duration(blueprint.dispatcher.tick_interval),
        liveness = blueprint.liveness.enabled && !args.no_liveness,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
        liveness: !args.no_liveness,
    };

    let stop = StopSignal::new();
    let pipeline = Pipeline::new(pipeline_config);

    info!("Starting pipeline...");

    let run = pipeline.run(stop.clone());
    tokio::pin!(run);

    let result = tokio::select! {
        result = &mut run => result,
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping pipeline...");
            stop.stop();
            run.await
        }
    };
    let stats = result.context("Pipeline execution failed")?;

    stats.print_summary();

    if !stats.feed_errors.is_empty() {
        return Err(CliError::feeds_failed(&stats.feed_errors).into());
    }

    info!("Pumpkin finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &RuntimeBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Dispatcher:");
    println!(
        "  Tick interval: {}",
        format_duration(blueprint.dispatcher.tick_interval)
    );
    let output = &blueprint.dispatcher.output;
    println!(
        "  Output defaults: rate={} volume={} voice={}",
        output.rate, output.volume, output.voice
    );

    println!("\nFeeds ({}):", blueprint.feeds.len());
    for feed in &blueprint.feeds {
        println!(
            "  - {} ({:?}) poll={} backoff={} - {} scripted messages",
            feed.name,
            feed.kind,
            format_duration(feed.effective_poll_interval()),
            format_duration(feed.effective_backoff()),
            feed.script.len()
        );
    }

    let liveness = &blueprint.liveness;
    println!("\nLiveness:");
    if liveness.enabled {
        println!(
            "  Feed: {}",
            liveness.feed.as_deref().unwrap_or("(first feed)")
        );
        println!(
            "  Period: {} .. {}",
            format_duration(liveness.min_period),
            format_duration(liveness.max_period)
        );
    } else {
        println!("  Disabled");
    }

    println!();
}
