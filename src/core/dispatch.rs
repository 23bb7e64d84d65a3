use reqwest::StatusCode;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::core::config::PanelConfig;
use crate::core::error::PanelError;
use crate::core::github::{auth_headers, truncate_body};
use crate::core::vault::CredentialStore;

#[derive(Debug, Serialize)]
struct DispatchRequest<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    inputs: &'a BTreeMap<String, String>,
}

/// Starts `workflow_dispatch` runs in the managed repository.
pub struct WorkflowDispatcher {
    http: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
    api_base: String,
    repo: String,
    git_ref: String,
    generation_workflow: String,
    cleanup_workflow: String,
}

impl WorkflowDispatcher {
    pub fn new(
        http: reqwest::Client,
        config: &PanelConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            http,
            credentials,
            api_base: config.api_base().to_string(),
            repo: config.repo.clone(),
            git_ref: config.git_ref.clone(),
            generation_workflow: config.workflows.generation.clone(),
            cleanup_workflow: config.workflows.cleanup.clone(),
        }
    }

    /// `true` only when GitHub answers 204 No Content.
    pub async fn dispatch(&self, workflow_id: &str, inputs: &BTreeMap<String, String>) -> bool {
        match self.try_dispatch(workflow_id, inputs).await {
            Ok(()) => true,
            Err(e) => {
                error!(workflow = workflow_id, status = ?e.status(), "Dispatch failed: {}", e);
                false
            }
        }
    }

    pub async fn try_dispatch(
        &self,
        workflow_id: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<(), PanelError> {
        let credential = self.credentials.get().await.ok_or(PanelError::NoCredential)?;
        let headers = auth_headers(&credential).ok_or(PanelError::NoCredential)?;

        let url = format!(
            "{}/repos/{}/actions/workflows/{}/dispatches",
            self.api_base,
            self.repo,
            urlencoding::encode(workflow_id)
        );
        let body = DispatchRequest {
            git_ref: &self.git_ref,
            inputs,
        };

        let response = self
            .http
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            info!(workflow = workflow_id, ?inputs, "Workflow dispatched");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(PanelError::DispatchRejected {
            workflow: workflow_id.to_string(),
            status: status.as_u16(),
            body: truncate_body(&body),
        })
    }

    /// Full generation run with the workflow's default inputs.
    pub async fn trigger_generation(&self) -> bool {
        self.dispatch(&self.generation_workflow, &BTreeMap::new()).await
    }

    /// Generation run using backup topic `index` instead of the day's pick.
    pub async fn switch_topic(&self, index: u32) -> bool {
        let inputs = BTreeMap::from([("topic_index".to_string(), index.to_string())]);
        self.dispatch(&self.generation_workflow, &inputs).await
    }

    /// Generation run with no model calls and no commit.
    pub async fn trigger_dry_run(&self) -> bool {
        let inputs = BTreeMap::from([("dry_run".to_string(), "true".to_string())]);
        self.dispatch(&self.generation_workflow, &inputs).await
    }

    pub async fn trigger_cleanup(&self) -> bool {
        self.dispatch(&self.cleanup_workflow, &BTreeMap::new()).await
    }
}
