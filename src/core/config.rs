use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

pub const API_URL_ENV: &str = "BLOGPANEL_API_URL";
pub const REPO_ENV: &str = "BLOGPANEL_REPO";

/// Where the managed pipeline lives and which files/workflows it exposes.
/// Loaded from `config.toml` in the data directory; every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// `owner/name` of the managed repository.
    pub repo: String,
    pub api_url: String,
    /// Branch that workflow dispatches target.
    pub git_ref: String,
    pub schedule_path: String,
    pub sources_path: String,
    pub stats_path: String,
    pub posts_path: String,
    pub workflows: WorkflowConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub generation: String,
    pub cleanup: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            repo: "Abivarma/blog-automation".to_string(),
            api_url: "https://api.github.com".to_string(),
            git_ref: "main".to_string(),
            schedule_path: ".github/workflows/daily-blog-generator.yml".to_string(),
            sources_path: "config/sources.json".to_string(),
            stats_path: "docs/data/stats.json".to_string(),
            posts_path: "docs/data/posts.json".to_string(),
            workflows: WorkflowConfig::default(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            generation: "daily-blog-generator.yml".to_string(),
            cleanup: "weekly-cleanup.yml".to_string(),
        }
    }
}

impl PanelConfig {
    pub async fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let config_path = data_dir.as_ref().join("config.toml");
        let mut config = if config_path.exists() {
            let content = tokio::fs::read_to_string(&config_path)
                .await
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            Self::parse(&content)
                .with_context(|| format!("Invalid config file {}", config_path.display()))?
        } else {
            info!("No config.toml found, using default pipeline settings.");
            Self::default()
        };

        if let Ok(url) = std::env::var(API_URL_ENV)
            && !url.trim().is_empty()
        {
            config.api_url = url.trim().to_string();
        }
        if let Ok(repo) = std::env::var(REPO_ENV)
            && !repo.trim().is_empty()
        {
            config.repo = repo.trim().to_string();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: PanelConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api_url)
            .with_context(|| format!("api_url '{}' is not a valid URL", self.api_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("api_url must use http or https, got '{}'", url.scheme());
        }

        let mut parts = self.repo.split('/');
        let valid_repo = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
        );
        if !valid_repo {
            bail!("repo must look like 'owner/name', got '{}'", self.repo);
        }

        if self.git_ref.trim().is_empty() {
            bail!("git_ref must not be empty");
        }
        Ok(())
    }

    /// Base URL with any trailing slash removed.
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}
