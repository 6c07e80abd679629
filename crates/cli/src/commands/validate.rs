//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{format_duration, FeedKind, RuntimeBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    tick_interval: String,
    mailbox_feeds: usize,
    social_feeds: usize,
    scripted_messages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    liveness_feed: Option<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let count_kind =
                |kind: FeedKind| blueprint.feeds.iter().filter(|f| f.kind == kind).count();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    tick_interval: format_duration(blueprint.dispatcher.tick_interval),
                    mailbox_feeds: count_kind(FeedKind::Mailbox),
                    social_feeds: count_kind(FeedKind::Social),
                    scripted_messages: blueprint.feeds.iter().map(|f| f.script.len()).sum(),
                    liveness_feed: liveness_feed(&blueprint),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Feed that will carry heartbeats, if any
fn liveness_feed(blueprint: &RuntimeBlueprint) -> Option<String> {
    if !blueprint.liveness.enabled {
        return None;
    }
    blueprint
        .liveness
        .feed
        .clone()
        .or_else(|| blueprint.feeds.first().map(|f| f.name.clone()))
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RuntimeBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.feeds.is_empty() {
        warnings.push("No feeds configured - nothing will be queued".to_string());
    }

    if blueprint.liveness.enabled && blueprint.feeds.is_empty() {
        warnings.push("Liveness enabled but there is no feed to carry heartbeats".to_string());
    }

    for feed in &blueprint.feeds {
        if feed.script.is_empty() {
            warnings.push(format!(
                "Feed '{}' has no scripted messages - the mock transport stays silent",
                feed.name
            ));
        }
        if feed.credentials.is_none() {
            warnings.push(format!("Feed '{}' has no credentials", feed.name));
        }
        if feed.outbound_wait > feed.effective_poll_interval() {
            warnings.push(format!(
                "Feed '{}' outbound_wait exceeds its poll interval and is clipped to it",
                feed.name
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Tick interval: {}", summary.tick_interval);
            println!("  Mailbox feeds: {}", summary.mailbox_feeds);
            println!("  Social feeds: {}", summary.social_feeds);
            println!("  Scripted messages: {}", summary.scripted_messages);
            println!(
                "  Heartbeats via: {}",
                summary.liveness_feed.as_deref().unwrap_or("(disabled)")
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
