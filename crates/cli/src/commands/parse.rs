//! `parse` command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use ingestion::{acknowledgement_text, format_directives, DirectiveParser};

use crate::cli::ParseArgs;

/// Execute the `parse` command
pub fn run_parse(args: &ParseArgs) -> Result<()> {
    let received_at = args.received_at.unwrap_or_else(Utc::now);
    let parsed = DirectiveParser::parse(&args.text, received_at);

    if args.json {
        let json =
            serde_json::to_string_pretty(&parsed).context("Failed to serialize parsed message")?;
        println!("{}", json);
        return Ok(());
    }

    println!("Text:         {}", parsed.clean_text);
    println!("Received at:  {}", received_at.to_rfc3339());
    println!("Release time: {}", parsed.release_time.to_rfc3339());
    if parsed.directives.is_empty() {
        println!("Directives:   (none)");
    } else {
        println!("Directives:   {}", format_directives(&parsed.directives));
    }
    println!("Reply:        {}", acknowledgement_text(&parsed));
    Ok(())
}
