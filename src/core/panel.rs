//! Operator actions: one progress line, the remote call, one outcome line.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::config::PanelConfig;
use crate::core::dispatch::WorkflowDispatcher;
use crate::core::github::ContentClient;
use crate::core::mutator::ConfigMutator;
use crate::core::status::{StatusLevel, StatusReporter};
use crate::core::vault::CredentialStore;

pub const MISSING_TOKEN_MESSAGE: &str =
    "Please configure your GitHub token first: blogpanel token set";

pub struct ControlPanel {
    credentials: Arc<dyn CredentialStore>,
    mutator: ConfigMutator,
    dispatcher: WorkflowDispatcher,
    reporter: Arc<dyn StatusReporter>,
}

impl ControlPanel {
    pub fn new(
        http: reqwest::Client,
        config: &PanelConfig,
        credentials: Arc<dyn CredentialStore>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        let client = ContentClient::new(http.clone(), config, Arc::clone(&credentials));
        let mutator = ConfigMutator::new(
            client,
            config.schedule_path.clone(),
            config.sources_path.clone(),
        );
        let dispatcher = WorkflowDispatcher::new(http, config, Arc::clone(&credentials));
        Self {
            credentials,
            mutator,
            dispatcher,
            reporter,
        }
    }

    pub fn mutator(&self) -> &ConfigMutator {
        &self.mutator
    }

    pub fn reporter(&self) -> &dyn StatusReporter {
        self.reporter.as_ref()
    }

    fn say(&self, level: StatusLevel, message: &str) {
        self.reporter.report(level, message);
    }

    /// Warn and return `false` when no token is stored.
    pub async fn ensure_credential(&self) -> bool {
        if self.credentials.get().await.is_some() {
            return true;
        }
        self.say(StatusLevel::Warning, MISSING_TOKEN_MESSAGE);
        false
    }

    fn conclude(&self, ok: bool, success: &str, failure: &str) -> bool {
        if ok {
            self.say(StatusLevel::Success, success);
        } else {
            self.say(StatusLevel::Error, failure);
        }
        ok
    }

    pub async fn trigger_generation(&self) -> bool {
        if !self.ensure_credential().await {
            return false;
        }
        self.say(StatusLevel::Info, "Triggering blog generation...");
        let ok = self.dispatcher.trigger_generation().await;
        self.conclude(
            ok,
            "Blog generation triggered! Check GitHub Actions for progress.",
            "Failed to trigger. Check your GitHub token.",
        )
    }

    pub async fn switch_topic(&self, index: u32) -> bool {
        if !self.ensure_credential().await {
            return false;
        }
        self.say(
            StatusLevel::Info,
            &format!("Switching to backup topic #{}...", index),
        );
        let ok = self.dispatcher.switch_topic(index).await;
        self.conclude(
            ok,
            &format!(
                "Topic switch triggered (topic #{})! Check GitHub Actions.",
                index
            ),
            "Failed to trigger. Check your GitHub token.",
        )
    }

    pub async fn trigger_dry_run(&self) -> bool {
        if !self.ensure_credential().await {
            return false;
        }
        self.say(StatusLevel::Info, "Triggering dry run...");
        let ok = self.dispatcher.trigger_dry_run().await;
        self.conclude(
            ok,
            "Dry run triggered! Check GitHub Actions for results.",
            "Failed to trigger.",
        )
    }

    pub async fn trigger_cleanup(&self) -> bool {
        if !self.ensure_credential().await {
            return false;
        }
        self.say(StatusLevel::Info, "Triggering cleanup...");
        let ok = self.dispatcher.trigger_cleanup().await;
        self.conclude(ok, "Cleanup triggered!", "Failed to trigger.")
    }

    pub async fn update_schedule(&self, cron: &str) -> bool {
        if !self.ensure_credential().await {
            return false;
        }
        self.say(
            StatusLevel::Info,
            &format!("Updating schedule to '{}'...", cron),
        );
        let ok = self.mutator.update_schedule(cron).await;
        self.conclude(
            ok,
            &format!("Schedule updated to '{}'.", cron),
            "Failed to update schedule.",
        )
    }

    pub async fn update_sources(&self, changes: &BTreeMap<String, bool>) -> bool {
        if !self.ensure_credential().await {
            return false;
        }
        self.say(StatusLevel::Info, "Updating source configuration...");
        let ok = self.mutator.update_source_config(changes).await;
        self.conclude(
            ok,
            "Source configuration updated.",
            "Failed to update source configuration.",
        )
    }
}
