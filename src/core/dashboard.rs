//! Read-only view of what the pipeline has produced so far.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::core::error::PanelError;
use crate::core::github::ContentClient;

/// Number of posts listed after the latest draft.
pub const RECENT_POSTS: usize = 7;

/// `null` reads as the type's default, same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeywordField {
    List(Vec<Option<String>>),
    Text(String),
}

/// Front matter with an empty `keywords:` line arrives as `""`, and a
/// hand-written one as `"a, b"`. Both are accepted along with lists and null.
fn lenient_keywords<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let words: Vec<String> = match Option::<KeywordField>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(KeywordField::List(items)) => items.into_iter().flatten().collect(),
        Some(KeywordField::Text(text)) => text.split(',').map(str::to_string).collect(),
    };
    Ok(words
        .into_iter()
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect())
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineStats {
    #[serde(deserialize_with = "null_as_default")]
    pub total_posts: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub avg_word_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub avg_seo_score: u64,
    pub last_generated: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub posts_this_week: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub posts_this_month: u64,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PostSummary {
    #[serde(deserialize_with = "null_as_default")]
    pub filename: String,
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub word_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub seo_score: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "lenient_keywords")]
    pub keywords: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub meta_description: String,
}

/// Decode each post on its own; an entry that still does not fit is logged
/// and left out instead of hiding the rest.
pub fn parse_posts(path: &str, bytes: &[u8]) -> Result<Vec<PostSummary>, PanelError> {
    let entries: Vec<Value> =
        serde_json::from_slice(bytes).map_err(|e| PanelError::ParseFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<PostSummary>(entry) {
            Ok(post) => Some(post),
            Err(e) => {
                warn!(path, index, "Skipping unreadable post entry: {}", e);
                None
            }
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeoBand {
    High,
    Mid,
    Low,
}

impl SeoBand {
    pub fn of(score: u64) -> Self {
        match score {
            80.. => SeoBand::High,
            60..=79 => SeoBand::Mid,
            _ => SeoBand::Low,
        }
    }
}

/// Stats and posts as loaded; either side may be missing.
#[derive(Debug, Default)]
pub struct Overview {
    pub stats: Option<PipelineStats>,
    pub posts: Option<Vec<PostSummary>>,
}

impl Overview {
    pub fn latest(&self) -> Option<&PostSummary> {
        self.posts.as_ref().and_then(|p| p.first())
    }

    pub fn recent(&self) -> &[PostSummary] {
        match &self.posts {
            Some(posts) if posts.len() > 1 => {
                let end = posts.len().min(RECENT_POSTS + 1);
                &posts[1..end]
            }
            _ => &[],
        }
    }
}

async fn fetch_stats(client: &ContentClient, path: &str) -> Result<PipelineStats, PanelError> {
    let file = client.fetch_public_file(path).await?;
    serde_json::from_slice(&file.content).map_err(|e| PanelError::ParseFailed {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

async fn fetch_posts(client: &ContentClient, path: &str) -> Result<Vec<PostSummary>, PanelError> {
    let file = client.fetch_public_file(path).await?;
    parse_posts(path, &file.content)
}

/// Load stats and posts independently; a failure on one side is logged and
/// leaves that side empty. Reads go out anonymously when no token is stored.
pub async fn load_overview(client: &ContentClient, stats_path: &str, posts_path: &str) -> Overview {
    let stats = match fetch_stats(client, stats_path).await {
        Ok(stats) => Some(stats),
        Err(e) => {
            warn!("Could not load stats: {}", e);
            None
        }
    };
    let posts = match fetch_posts(client, posts_path).await {
        Ok(posts) => Some(posts),
        Err(e) => {
            warn!("Could not load posts: {}", e);
            None
        }
    };
    Overview { stats, posts }
}
