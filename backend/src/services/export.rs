//! Story export
//!
//! Renders a stored story as a downloadable plain-text or Markdown document.

use crate::models::{ExportFormat, StoryWithRepository};

/// Rendered document ready to be served as a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

pub fn export_story(story: &StoryWithRepository, format: ExportFormat) -> ExportDocument {
    ExportDocument {
        filename: export_filename(&story.story.title, format),
        content_type: format.content_type(),
        body: render_export(story, format),
    }
}

pub fn render_export(story: &StoryWithRepository, format: ExportFormat) -> String {
    let title = &story.story.title;
    let body = story.story.content.trim();
    let url = story
        .repository
        .as_ref()
        .map(|r| r.url.as_str())
        .unwrap_or("Unknown");
    let generated = story.story.created_at.format("%B %-d, %Y");

    match format {
        ExportFormat::Markdown => format!(
            "# {title}\n\n{body}\n\n---\n\n**Repository:** {url}\n\n**Generated:** {generated}\n"
        ),
        ExportFormat::Text => {
            let underline = "=".repeat(title.chars().count());
            format!("{title}\n{underline}\n\n{body}\n\nRepository: {url}\nGenerated: {generated}\n")
        }
    }
}

/// Slugified title plus the format's extension
pub fn export_filename(title: &str, format: ExportFormat) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "story" } else { slug };
    format!("{slug}.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StoredRepository, StoredStory, StoryInsights};
    use chrono::{TimeZone, Utc};

    fn story(with_repo: bool) -> StoryWithRepository {
        let created_at = Utc.with_ymd_and_hms(2026, 10, 15, 9, 30, 0).unwrap();
        StoryWithRepository {
            story: StoredStory {
                story_id: "story-1".to_string(),
                owner_id: "user-1".to_string(),
                repository_id: with_repo.then(|| "repo-1".to_string()),
                title: "The Story of octo/demo".to_string(),
                content: "Once upon a time.\n".to_string(),
                insights: StoryInsights {
                    total_commits: 8,
                    commits_estimated: false,
                    contributors: 2,
                    top_languages: vec!["Rust".to_string()],
                    timespan: "2 months".to_string(),
                    stars: 1,
                    forks: 0,
                },
                created_at,
            },
            repository: with_repo.then(|| StoredRepository {
                repo_id: "repo-1".to_string(),
                owner_id: "user-1".to_string(),
                url: "https://github.com/octo/demo".to_string(),
                full_name: "octo/demo".to_string(),
                description: None,
                language: Some("Rust".to_string()),
                stars: 1,
                forks: 0,
                created_at,
            }),
        }
    }

    #[test]
    fn test_markdown_export() {
        let rendered = render_export(&story(true), ExportFormat::Markdown);
        assert_eq!(
            rendered,
            "# The Story of octo/demo\n\n\
             Once upon a time.\n\n\
             ---\n\n\
             **Repository:** https://github.com/octo/demo\n\n\
             **Generated:** October 15, 2026\n"
        );
    }

    #[test]
    fn test_text_export() {
        let rendered = render_export(&story(true), ExportFormat::Text);
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("The Story of octo/demo"));
        assert_eq!(lines.next(), Some("======================"));
        assert!(rendered.contains("\nOnce upon a time.\n"));
        assert!(rendered.contains("Repository: https://github.com/octo/demo\n"));
        assert!(rendered.ends_with("Generated: October 15, 2026\n"));
    }

    #[test]
    fn test_export_without_repository() {
        let rendered = render_export(&story(false), ExportFormat::Text);
        assert!(rendered.contains("Repository: Unknown"));
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(
            export_filename("The Story of octo/demo", ExportFormat::Markdown),
            "the-story-of-octo-demo.md"
        );
        assert_eq!(
            export_filename("  Rust & Friends!! ", ExportFormat::Text),
            "rust-friends.txt"
        );
        assert_eq!(export_filename("???", ExportFormat::Text), "story.txt");
    }

    #[test]
    fn test_export_story_document() {
        let doc = export_story(&story(true), ExportFormat::Text);
        assert_eq!(doc.filename, "the-story-of-octo-demo.txt");
        assert_eq!(doc.content_type, "text/plain; charset=utf-8");
    }
}
