use anyhow::Result;
use console::style;
use tracing::error;

use super::{AppContext, RunKind, parse_schedule_value, parse_source_changes};
use crate::core::terminal::{GuideSection, print_error};

pub(super) async fn run_generation(ctx: &AppContext, kind: RunKind) -> Result<bool> {
    let panel = ctx.panel()?;
    Ok(match kind {
        RunKind::Full => panel.trigger_generation().await,
        RunKind::Topic(index) => panel.switch_topic(index).await,
        RunKind::DryRun => panel.trigger_dry_run().await,
    })
}

pub(super) async fn run_cleanup(ctx: &AppContext) -> Result<bool> {
    Ok(ctx.panel()?.trigger_cleanup().await)
}

pub(super) async fn run_schedule_command(ctx: &AppContext, args: &[String]) -> Result<bool> {
    let panel = ctx.panel()?;
    match args.get(2).map(String::as_str).unwrap_or("") {
        "" | "show" => {
            if !panel.ensure_credential().await {
                return Ok(false);
            }
            match panel.mutator().read_schedule().await {
                Ok(cron) => {
                    GuideSection::new("Generation schedule")
                        .status("Cron", &style(&cron).green().bold().to_string())
                        .status("Workflow", &ctx.config.schedule_path)
                        .print();
                    println!();
                    Ok(true)
                }
                Err(e) => {
                    error!("Reading schedule failed: {}", e);
                    print_error("Could not read the current schedule.");
                    Ok(false)
                }
            }
        }
        "set" => match parse_schedule_value(args, 3) {
            Ok(Some(cron)) => Ok(panel.update_schedule(cron).await),
            Err(e) => {
                print_error(&e.to_string());
                Ok(false)
            }
            Ok(None) => {
                GuideSection::new("blogpanel schedule set")
                    .text("Usage: blogpanel schedule set \"<minute> <hour> <day> <month> <weekday>\"")
                    .blank()
                    .hint("blogpanel schedule set \"0 6 * * *\"", "every day at 06:00 UTC")
                    .print();
                println!();
                Ok(false)
            }
        },
        other => {
            print_error(&format!("Unknown schedule command: {}", other));
            Ok(false)
        }
    }
}

pub(super) async fn run_sources_command(ctx: &AppContext, args: &[String]) -> Result<bool> {
    let panel = ctx.panel()?;
    match args.get(2).map(String::as_str).unwrap_or("") {
        "" | "show" => {
            if !panel.ensure_credential().await {
                return Ok(false);
            }
            match panel.mutator().read_sources().await {
                Ok(sources) => {
                    let mut section = GuideSection::new("News sources");
                    if sources.is_empty() {
                        section = section.text("No sources configured.");
                    }
                    for (name, enabled) in &sources {
                        let state = if *enabled {
                            style("ENABLED").green().bold().to_string()
                        } else {
                            style("DISABLED").dim().to_string()
                        };
                        section = section.bullet(&format!("{} [{}]", style(name).bold(), state));
                    }
                    section.print();
                    println!();
                    Ok(true)
                }
                Err(e) => {
                    error!("Reading sources failed: {}", e);
                    print_error("Could not read the source configuration.");
                    Ok(false)
                }
            }
        }
        "set" => {
            let changes = parse_source_changes(args, 3)?;
            Ok(panel.update_sources(&changes).await)
        }
        other => {
            print_error(&format!("Unknown sources command: {}", other));
            Ok(false)
        }
    }
}
