use anyhow::Result;
use console::style;

use super::AppContext;
use crate::core::dashboard::{Overview, PostSummary, SeoBand, load_overview};
use crate::core::status::StatusLevel;
use crate::core::terminal::GuideSection;

fn seo_badge(score: u64) -> String {
    let label = format!("SEO {}", score);
    match SeoBand::of(score) {
        SeoBand::High => style(label).green().to_string(),
        SeoBand::Mid => style(label).yellow().to_string(),
        SeoBand::Low => style(label).red().to_string(),
    }
}

fn post_line(post: &PostSummary) -> String {
    format!(
        "{}  {}  {} words  {}",
        style(&post.date).dim(),
        style(&post.title).bold(),
        post.word_count,
        seo_badge(post.seo_score)
    )
}

fn print_overview(overview: &Overview) {
    let mut stats_section = GuideSection::new("Pipeline stats");
    match &overview.stats {
        Some(stats) => {
            let avg_seo = if stats.avg_seo_score > 0 {
                format!("{}/100", stats.avg_seo_score)
            } else {
                "-".to_string()
            };
            let avg_words = if stats.avg_word_count > 0 {
                stats.avg_word_count.to_string()
            } else {
                "-".to_string()
            };
            stats_section = stats_section
                .status("Total posts", &stats.total_posts.to_string())
                .status("Avg SEO", &avg_seo)
                .status("Avg words", &avg_words)
                .status(
                    "Last generated",
                    stats.last_generated.as_deref().unwrap_or("Unknown"),
                )
                .status("This week", &stats.posts_this_week.to_string())
                .status("This month", &stats.posts_this_month.to_string());
            if let Some(updated) = &stats.updated_at {
                stats_section = stats_section.status("Updated", updated);
            }
        }
        None => stats_section = stats_section.text("Stats unavailable."),
    }
    stats_section.print();

    let mut latest_section = GuideSection::new("Latest draft");
    match overview.latest() {
        Some(post) => {
            latest_section = latest_section
                .text(&post_line(post))
                .status("Status", &post.status)
                .status("File", &post.filename);
            if !post.meta_description.is_empty() {
                latest_section = latest_section.text(&post.meta_description);
            }
            if !post.keywords.is_empty() {
                latest_section = latest_section.status("Keywords", &post.keywords.join(", "));
            }
        }
        None if overview.posts.is_some() => {
            latest_section =
                latest_section.text("No drafts yet. Generate your first blog post!");
        }
        None => {
            latest_section = latest_section
                .text("No data available. Run the pipeline to generate your first post.");
        }
    }
    latest_section.print();

    if overview.posts.is_some() {
        let mut recent_section = GuideSection::new("Recent posts");
        let recent = overview.recent();
        if recent.is_empty() {
            recent_section = recent_section.text("No additional posts yet.");
        }
        for post in recent {
            recent_section = recent_section.bullet(&post_line(post));
        }
        recent_section.print();
    }
    println!();
}

pub(super) async fn run_overview(ctx: &AppContext) -> Result<bool> {
    let panel = ctx.panel()?;
    let anonymous = ctx.credentials.get().await.is_none();
    if anonymous {
        tracing::debug!("No token stored; reading dashboard data anonymously");
    }

    let overview = load_overview(
        panel.mutator().client(),
        &ctx.config.stats_path,
        &ctx.config.posts_path,
    )
    .await;

    if overview.stats.is_none() {
        panel
            .reporter()
            .report(StatusLevel::Warning, "Could not load stats.");
    }
    if overview.posts.is_none() {
        panel
            .reporter()
            .report(StatusLevel::Warning, "Could not load posts.");
    }

    if anonymous && overview.stats.is_none() && overview.posts.is_none() {
        panel.reporter().report(
            StatusLevel::Info,
            "Private repository? Store a token with: blogpanel token set",
        );
    }

    print_overview(&overview);
    Ok(overview.stats.is_some() || overview.posts.is_some())
}
