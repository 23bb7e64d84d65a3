//! Read-modify-write edits of the pipeline's remote configuration files.
//!
//! Each edit fetches the file, transforms it in memory and writes it back
//! with the `sha` from that same fetch. The version is never cached between
//! calls.

use regex::bytes::{NoExpand, Regex};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{error, info, warn};

use crate::core::error::PanelError;
use crate::core::github::ContentClient;

static CRON_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cron:\s*'([^']+)'").expect("valid cron regex"));

/// Default schedule reported when the workflow file has no cron line.
pub const DEFAULT_SCHEDULE: &str = "0 6 * * *";

/// Five whitespace-separated fields, nothing that could close the YAML quote.
pub fn validate_cron(expr: &str) -> Result<(), PanelError> {
    let forbidden = expr.contains('\'') || expr.contains('\n') || expr.contains('\r');
    let fields = expr.split_whitespace().count();
    if forbidden || fields != 5 {
        return Err(PanelError::InvalidCron(expr.to_string()));
    }
    Ok(())
}

/// Replace the first `cron: '...'` occurrence, leaving every other byte alone.
/// Returns the edited text and whether a match was found.
pub fn replace_cron(document: &[u8], new_cron: &str) -> (Vec<u8>, bool) {
    let replacement = format!("cron: '{}'", new_cron);
    let found = CRON_FIELD.is_match(document);
    let edited = CRON_FIELD
        .replacen(document, 1, NoExpand(replacement.as_bytes()))
        .into_owned();
    (edited, found)
}

/// First cron expression in the document, if any.
pub fn extract_cron(document: &[u8]) -> Option<String> {
    CRON_FIELD
        .captures(document)
        .and_then(|caps| caps.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
}

/// Set `enabled` on every source named in `changes` that already exists as an
/// object. Returns the names that were touched; unknown names are skipped.
pub fn apply_source_changes(
    config: &mut serde_json::Map<String, Value>,
    changes: &BTreeMap<String, bool>,
) -> Vec<String> {
    let mut applied = Vec::new();
    for (source, enabled) in changes {
        if let Some(Value::Object(record)) = config.get_mut(source) {
            record.insert("enabled".to_string(), Value::Bool(*enabled));
            applied.push(source.clone());
        }
    }
    applied
}

/// Parse a sources document; anything but a top-level JSON object is rejected.
pub fn parse_source_config(
    path: &str,
    bytes: &[u8],
) -> Result<serde_json::Map<String, Value>, PanelError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(PanelError::ParseFailed {
            path: path.to_string(),
            reason: "top-level value is not an object".to_string(),
        }),
        Err(e) => Err(PanelError::ParseFailed {
            path: path.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Two-space pretty JSON in document key order, keeping the original
/// trailing newline if there was one.
fn render_source_config(
    config: &serde_json::Map<String, Value>,
    trailing_newline: bool,
) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = serde_json::to_vec_pretty(config)?;
    if trailing_newline {
        out.push(b'\n');
    }
    Ok(out)
}

pub struct ConfigMutator {
    client: ContentClient,
    schedule_path: String,
    sources_path: String,
}

impl ConfigMutator {
    pub fn new(
        client: ContentClient,
        schedule_path: impl Into<String>,
        sources_path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            schedule_path: schedule_path.into(),
            sources_path: sources_path.into(),
        }
    }

    pub fn client(&self) -> &ContentClient {
        &self.client
    }

    /// Point the generation workflow at `new_cron`. `false` on any failure;
    /// details go to the log.
    pub async fn update_schedule(&self, new_cron: &str) -> bool {
        match self.try_update_schedule(new_cron).await {
            Ok(()) => true,
            Err(e) => {
                error!(status = ?e.status(), "Schedule update failed: {}", e);
                false
            }
        }
    }

    pub async fn try_update_schedule(&self, new_cron: &str) -> Result<(), PanelError> {
        validate_cron(new_cron)?;

        let file = self.client.fetch_file(&self.schedule_path).await?;
        let (edited, found) = replace_cron(&file.content, new_cron);
        if !found {
            // Upstream behaviour: the untouched file is still committed.
            warn!(
                path = %self.schedule_path,
                "No cron line found; writing the workflow back unchanged"
            );
        }

        let message = format!("chore: update schedule to {}", new_cron);
        self.client
            .write_file(&file.path, &edited, &file.version, &message)
            .await?;
        info!(cron = new_cron, "Schedule updated");
        Ok(())
    }

    /// Enable/disable known sources. `false` on any failure.
    pub async fn update_source_config(&self, changes: &BTreeMap<String, bool>) -> bool {
        match self.try_update_source_config(changes).await {
            Ok(applied) => {
                info!(?applied, "Source configuration updated");
                true
            }
            Err(e) => {
                error!(status = ?e.status(), "Source config update failed: {}", e);
                false
            }
        }
    }

    pub async fn try_update_source_config(
        &self,
        changes: &BTreeMap<String, bool>,
    ) -> Result<Vec<String>, PanelError> {
        let file = self.client.fetch_file(&self.sources_path).await?;
        let mut config = parse_source_config(&self.sources_path, &file.content)?;

        let applied = apply_source_changes(&mut config, changes);
        let skipped: Vec<&String> = changes.keys().filter(|k| !applied.contains(*k)).collect();
        if !skipped.is_empty() {
            warn!(?skipped, "Ignoring unknown sources");
        }

        let trailing_newline = file.content.ends_with(b"\n");
        let rendered = render_source_config(&config, trailing_newline).map_err(|e| {
            PanelError::ParseFailed {
                path: self.sources_path.clone(),
                reason: e.to_string(),
            }
        })?;

        self.client
            .write_file(
                &file.path,
                &rendered,
                &file.version,
                "chore: update source configuration",
            )
            .await?;
        Ok(applied)
    }

    /// Current cron of the generation workflow ([`DEFAULT_SCHEDULE`] if none).
    pub async fn read_schedule(&self) -> Result<String, PanelError> {
        let file = self.client.fetch_file(&self.schedule_path).await?;
        Ok(extract_cron(&file.content).unwrap_or_else(|| DEFAULT_SCHEDULE.to_string()))
    }

    /// Each source's `enabled` flag, in document order. Missing flags read as off.
    pub async fn read_sources(&self) -> Result<Vec<(String, bool)>, PanelError> {
        let file = self.client.fetch_file(&self.sources_path).await?;
        let config = parse_source_config(&self.sources_path, &file.content)?;
        Ok(config
            .iter()
            .map(|(name, record)| {
                let enabled = record
                    .get("enabled")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                (name.clone(), enabled)
            })
            .collect())
    }
}
