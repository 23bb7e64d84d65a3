mod overview;
mod pipeline;
mod token;

use anyhow::{Result, bail};
use console::style;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::PanelConfig;
use crate::core::github::http_client;
use crate::core::panel::ControlPanel;
use crate::core::status::TerminalReporter;
use crate::core::terminal::{self, GuideSection, print_error};
use crate::core::vault::{CredentialStore, SecretsVault, VaultCredentialStore};
use crate::platform::{NativePlatform, Platform};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Pipeline")
        .command("run", "Trigger blog generation (--topic <n>, --dry-run)")
        .command("cleanup", "Trigger the weekly cleanup workflow")
        .command("overview", "Show stats and recent posts")
        .print();

    GuideSection::new("Configuration")
        .command("schedule", "Show or set the generation cron schedule")
        .command("sources", "Show or enable/disable news sources")
        .command("config", "Show the effective panel settings")
        .print();

    GuideSection::new("Setup")
        .command("token", "Store, check or clear the GitHub token")
        .print();

    println!(
        "\n {} {} <command> [subcommand] [--verbose]\n",
        style("Usage:").bold(),
        style("blogpanel").green()
    );
}

/// What `blogpanel run` should dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunKind {
    Full,
    Topic(u32),
    DryRun,
}

/// Drop `--verbose`/`-v` wherever it appears; report whether it was present.
pub(crate) fn split_global_flags(args: &[String]) -> (Vec<String>, bool) {
    let mut verbose = false;
    let rest = args
        .iter()
        .filter(|arg| {
            let is_flag = matches!(arg.as_str(), "--verbose" | "-v");
            verbose |= is_flag;
            !is_flag
        })
        .cloned()
        .collect();
    (rest, verbose)
}

pub(crate) fn parse_run_flags(args: &[String], start: usize) -> Result<RunKind> {
    let mut topic: Option<u32> = None;
    let mut dry_run = false;
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--topic" | "-t" => {
                let Some(value) = args.get(i + 1) else {
                    bail!("--topic needs a backup topic index");
                };
                match value.parse() {
                    Ok(index) => topic = Some(index),
                    Err(_) => bail!("Topic index must be a non-negative number, got '{}'", value),
                }
                i += 2;
            }
            "--dry-run" => {
                dry_run = true;
                i += 1;
            }
            other => bail!("Unknown option for run: {}", other),
        }
    }

    match (topic, dry_run) {
        (Some(_), true) => bail!("--topic and --dry-run cannot be combined"),
        (Some(index), false) => Ok(RunKind::Topic(index)),
        (None, true) => Ok(RunKind::DryRun),
        (None, false) => Ok(RunKind::Full),
    }
}

/// The cron for `schedule set` must arrive as one quoted argument. `None`
/// when it is missing.
pub(crate) fn parse_schedule_value(args: &[String], start: usize) -> Result<Option<&str>> {
    match &args[start.min(args.len())..] {
        [] => Ok(None),
        [cron] => Ok(Some(cron.trim())),
        rest => bail!(
            "Got {} separate arguments; quote the cron expression, e.g. blogpanel schedule set \"{}\"",
            rest.len(),
            rest.join(" ")
        ),
    }
}

fn parse_toggle(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "enable" | "enabled" | "1" => Some(true),
        "off" | "false" | "no" | "disable" | "disabled" | "0" => Some(false),
        _ => None,
    }
}

fn push_names(changes: &mut BTreeMap<String, bool>, list: &str, enabled: bool) {
    for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        changes.insert(name.to_string(), enabled);
    }
}

/// `--enable a,b --disable c name=on other=off`; later mentions win.
pub(crate) fn parse_source_changes(args: &[String], start: usize) -> Result<BTreeMap<String, bool>> {
    let mut changes = BTreeMap::new();
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            flag @ ("--enable" | "--disable") => {
                let Some(list) = args.get(i + 1) else {
                    bail!("{} needs a comma-separated list of sources", flag);
                };
                push_names(&mut changes, list, flag == "--enable");
                i += 2;
            }
            pair => {
                let Some((name, value)) = pair.split_once('=') else {
                    bail!("Expected <source>=on|off, got '{}'", pair);
                };
                let Some(enabled) = parse_toggle(value) else {
                    bail!("Unknown value '{}' for source '{}' (use on/off)", value, name);
                };
                if name.trim().is_empty() {
                    bail!("Missing source name in '{}'", pair);
                }
                changes.insert(name.trim().to_string(), enabled);
                i += 1;
            }
        }
    }
    if changes.is_empty() {
        bail!("No source changes given");
    }
    Ok(changes)
}

/// Everything a command needs once setup has run.
pub(crate) struct AppContext {
    pub data_dir: PathBuf,
    pub config: PanelConfig,
    pub credentials: Arc<dyn CredentialStore>,
}

impl AppContext {
    async fn load(data_dir: PathBuf) -> Result<Self> {
        let config = PanelConfig::load(&data_dir).await?;
        let vault = SecretsVault::open(&data_dir).await?;
        Ok(Self {
            data_dir,
            config,
            credentials: Arc::new(VaultCredentialStore::new(vault)),
        })
    }

    pub fn panel(&self) -> Result<ControlPanel> {
        Ok(ControlPanel::new(
            http_client()?,
            &self.config,
            Arc::clone(&self.credentials),
            Arc::new(TerminalReporter),
        ))
    }
}

fn print_config(ctx: &AppContext) {
    GuideSection::new("Panel settings")
        .status("Data dir", &ctx.data_dir.display().to_string())
        .status("Repository", &ctx.config.repo)
        .status("API", &ctx.config.api_url)
        .status("Branch", &ctx.config.git_ref)
        .blank()
        .status("Schedule file", &ctx.config.schedule_path)
        .status("Sources file", &ctx.config.sources_path)
        .status("Stats file", &ctx.config.stats_path)
        .status("Posts file", &ctx.config.posts_path)
        .blank()
        .status("Generation", &ctx.config.workflows.generation)
        .status("Cleanup", &ctx.config.workflows.cleanup)
        .print();
    println!();
}

/// Returns whether the command achieved what was asked.
pub async fn run_main() -> Result<bool> {
    let raw: Vec<String> = std::env::args().collect();
    let (args, verbose) = split_global_flags(&raw);

    let cmd = args.get(1).map(String::as_str).unwrap_or("");
    if matches!(cmd, "" | "help" | "--help" | "-h") {
        print_help();
        return Ok(true);
    }

    let data_dir = NativePlatform::data_dir();
    crate::logging::init(&data_dir, verbose);
    tracing::debug!(command = cmd, "blogpanel starting");

    let known = [
        "token", "run", "cleanup", "schedule", "sources", "overview", "config",
    ];
    if !known.contains(&cmd) {
        print_error(&format!("Unknown command: {}", cmd));
        print_help();
        return Ok(false);
    }

    let ctx = AppContext::load(data_dir).await?;
    let sub_cmd = args.get(2).map(String::as_str).unwrap_or("");

    match cmd {
        "token" => token::run_token_command(&ctx, &args).await,
        "run" => {
            let kind = parse_run_flags(&args, 2)?;
            pipeline::run_generation(&ctx, kind).await
        }
        "cleanup" => pipeline::run_cleanup(&ctx).await,
        "schedule" => pipeline::run_schedule_command(&ctx, &args).await,
        "sources" => pipeline::run_sources_command(&ctx, &args).await,
        "overview" => overview::run_overview(&ctx).await,
        "config" => match sub_cmd {
            "" | "show" => {
                print_config(&ctx);
                Ok(true)
            }
            other => {
                print_error(&format!("Unknown config command: {}", other));
                Ok(false)
            }
        },
        _ => Ok(false),
    }
}
