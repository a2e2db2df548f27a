//! Insight Aggregator
//!
//! Pure transformation from raw GitHub responses into a `RepositoryAnalysis`.
//! No network or storage access happens here.

use crate::models::{
    CommitActivityWeek, CommitCount, LanguageBreakdown, RawRepositoryData, RepositoryAnalysis,
    RepositoryMetadata, Timespan,
};

/// Number of languages kept in the analysis
pub const DEFAULT_TOP_LANGUAGES: usize = 5;

/// Floor applied to estimated commit counts
const MIN_ESTIMATED_COMMITS: u64 = 10;

/// Assumed commits per week of repository age when estimating
const ESTIMATED_COMMITS_PER_WEEK: u64 = 2;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Creation to last activity. Last activity is the last push, or the last
/// update when GitHub reports no push.
pub fn compute_timespan(metadata: &RepositoryMetadata) -> Timespan {
    let first_seen = metadata.created_at;
    let last_seen = metadata.pushed_at.unwrap_or(metadata.updated_at);
    let millis = (last_seen - first_seen).num_milliseconds();

    Timespan {
        first_seen,
        last_seen,
        duration_days: millis.div_euclid(MILLIS_PER_DAY).max(0),
    }
}

/// `max(ceil(days / 7) * 2, 10)`
pub fn estimate_commits(duration_days: i64) -> u64 {
    let days = duration_days.max(0) as u64;
    let weeks = days.div_ceil(7);
    (weeks * ESTIMATED_COMMITS_PER_WEEK).max(MIN_ESTIMATED_COMMITS)
}

/// Sums the weekly buckets when there are any, otherwise estimates from age.
pub fn total_commits(weeks: Option<&[CommitActivityWeek]>, duration_days: i64) -> CommitCount {
    match weeks {
        Some(weeks) if !weeks.is_empty() => {
            CommitCount::Authoritative(weeks.iter().map(|w| w.total).sum())
        }
        _ => CommitCount::Estimated(estimate_commits(duration_days)),
    }
}

/// Language names ordered by byte count, largest first.
///
/// The sort is stable over the map's name order, so equal byte counts come
/// out alphabetically.
pub fn top_languages(languages: &LanguageBreakdown, n: usize) -> Vec<String> {
    let mut entries: Vec<(&String, &u64)> = languages.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1));
    entries
        .into_iter()
        .take(n)
        .map(|(name, _)| name.clone())
        .collect()
}

fn pluralize(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Human-readable repository age.
///
/// Under 30 days the raw day count is shown; under a year whole 30-day
/// months; otherwise years plus leftover months.
pub fn format_timespan(days: i64) -> String {
    if days < 30 {
        return format!("{days} days");
    }

    if days < 365 {
        return pluralize(days / 30, "month");
    }

    let years = days / 365;
    let months = (days % 365) / 30;
    let mut formatted = pluralize(years, "year");
    if months > 0 {
        formatted.push_str(", ");
        formatted.push_str(&pluralize(months, "month"));
    }
    formatted
}

/// Build the analysis record for one fetch run
pub fn aggregate(url: &str, raw: RawRepositoryData) -> RepositoryAnalysis {
    let timespan = compute_timespan(&raw.metadata);
    let commits = total_commits(raw.commit_activity.as_deref(), timespan.duration_days);
    let top_languages = top_languages(&raw.languages, DEFAULT_TOP_LANGUAGES);
    let formatted_timespan = format_timespan(timespan.duration_days);

    RepositoryAnalysis {
        url: url.to_string(),
        metadata: raw.metadata,
        contributors: raw.contributors,
        languages: raw.languages,
        commits,
        timespan,
        top_languages,
        formatted_timespan,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContributorRecord, RepositoryOwner, StoryInsights};
    use chrono::{DateTime, Duration, Utc};

    fn metadata(created: &str, updated: &str, pushed: Option<&str>) -> RepositoryMetadata {
        let parse = |s: &str| s.parse::<DateTime<Utc>>().expect("valid timestamp");
        RepositoryMetadata {
            id: 42,
            name: "demo".to_string(),
            full_name: "octo/demo".to_string(),
            owner: RepositoryOwner {
                login: "octo".to_string(),
            },
            html_url: "https://github.com/octo/demo".to_string(),
            description: Some("A demo".to_string()),
            language: Some("Rust".to_string()),
            size: 100,
            stargazers_count: 7,
            forks_count: 2,
            open_issues_count: 1,
            created_at: parse(created),
            updated_at: parse(updated),
            pushed_at: pushed.map(parse),
            private: false,
            default_branch: Some("main".to_string()),
        }
    }

    fn week(total: u64) -> CommitActivityWeek {
        CommitActivityWeek {
            week: 1_700_000_000,
            total,
            days: vec![0; 7],
        }
    }

    #[test]
    fn test_format_timespan_days() {
        assert_eq!(format_timespan(0), "0 days");
        assert_eq!(format_timespan(1), "1 days");
        assert_eq!(format_timespan(29), "29 days");
    }

    #[test]
    fn test_format_timespan_months() {
        assert_eq!(format_timespan(30), "1 month");
        assert_eq!(format_timespan(59), "1 month");
        assert_eq!(format_timespan(60), "2 months");
        assert_eq!(format_timespan(364), "12 months");
    }

    #[test]
    fn test_format_timespan_years() {
        assert_eq!(format_timespan(365), "1 year");
        assert_eq!(format_timespan(394), "1 year");
        assert_eq!(format_timespan(400), "1 year, 1 month");
        assert_eq!(format_timespan(730), "2 years");
        assert_eq!(format_timespan(800), "2 years, 2 months");
    }

    #[test]
    fn test_top_languages_orders_by_bytes() {
        let languages = LanguageBreakdown::from([
            ("A".to_string(), 100),
            ("B".to_string(), 50),
            ("C".to_string(), 200),
        ]);
        assert_eq!(top_languages(&languages, 2), vec!["C", "A"]);
        assert_eq!(top_languages(&languages, 10), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_top_languages_ties_are_alphabetical() {
        let languages = LanguageBreakdown::from([
            ("Zig".to_string(), 10),
            ("Ada".to_string(), 10),
            ("Go".to_string(), 30),
        ]);
        assert_eq!(top_languages(&languages, 3), vec!["Go", "Ada", "Zig"]);
    }

    #[test]
    fn test_top_languages_empty() {
        assert!(top_languages(&LanguageBreakdown::new(), 5).is_empty());
    }

    #[test]
    fn test_estimate_commits_floor() {
        assert_eq!(estimate_commits(0), 10);
        assert_eq!(estimate_commits(10), 10);
        assert_eq!(estimate_commits(35), 10);
    }

    #[test]
    fn test_estimate_commits_grows_with_age() {
        // ceil(36 / 7) = 6 weeks
        assert_eq!(estimate_commits(36), 12);
        // ceil(365 / 7) = 53 weeks
        assert_eq!(estimate_commits(365), 106);
    }

    #[test]
    fn test_total_commits_without_weeks_is_estimated() {
        assert_eq!(total_commits(None, 10), CommitCount::Estimated(10));
        assert_eq!(total_commits(Some(&[]), 10), CommitCount::Estimated(10));
    }

    #[test]
    fn test_total_commits_sums_weeks() {
        let weeks = vec![week(3), week(5)];
        assert_eq!(
            total_commits(Some(&weeks), 10_000),
            CommitCount::Authoritative(8)
        );
    }

    #[test]
    fn test_timespan_prefers_pushed_at() {
        let meta = metadata(
            "2024-01-01T00:00:00Z",
            "2024-12-31T00:00:00Z",
            Some("2024-01-11T12:00:00Z"),
        );
        let span = compute_timespan(&meta);
        assert_eq!(span.duration_days, 10);
        assert_eq!(span.last_seen, meta.pushed_at.expect("pushed_at set"));
    }

    #[test]
    fn test_timespan_falls_back_to_updated_at() {
        let meta = metadata("2024-01-01T00:00:00Z", "2024-03-01T00:00:00Z", None);
        let span = compute_timespan(&meta);
        assert_eq!(span.duration_days, 60);
        assert_eq!(span.last_seen, meta.updated_at);
    }

    #[test]
    fn test_timespan_never_negative() {
        let mut meta = metadata("2024-01-10T00:00:00Z", "2024-01-10T00:00:00Z", None);
        meta.updated_at = meta.created_at - Duration::days(3);
        assert_eq!(compute_timespan(&meta).duration_days, 0);
    }

    #[test]
    fn test_aggregate_with_degraded_secondaries() {
        let raw = RawRepositoryData {
            metadata: metadata(
                "2024-01-01T00:00:00Z",
                "2024-01-11T00:00:00Z",
                Some("2024-01-11T00:00:00Z"),
            ),
            contributors: Vec::new(),
            languages: LanguageBreakdown::new(),
            commit_activity: None,
        };

        let analysis = aggregate("https://github.com/octo/demo", raw);
        assert_eq!(analysis.commits, CommitCount::Estimated(10));
        assert!(analysis.top_languages.is_empty());
        assert_eq!(analysis.formatted_timespan, "10 days");

        let insights = StoryInsights::from_analysis(&analysis);
        assert_eq!(insights.contributors, 0);
        assert_eq!(insights.total_commits, 10);
        assert!(insights.commits_estimated);
    }

    #[test]
    fn test_aggregate_with_full_data() {
        let raw = RawRepositoryData {
            metadata: metadata(
                "2022-01-01T00:00:00Z",
                "2023-02-05T00:00:00Z",
                Some("2023-02-05T00:00:00Z"),
            ),
            contributors: vec![ContributorRecord {
                login: "octocat".to_string(),
                contributions: 12,
                avatar_url: None,
                account_type: Some("User".to_string()),
            }],
            languages: LanguageBreakdown::from([
                ("Rust".to_string(), 9000),
                ("Shell".to_string(), 100),
            ]),
            commit_activity: Some(vec![week(4), week(0), week(6)]),
        };

        let analysis = aggregate("https://github.com/octo/demo", raw);
        assert_eq!(analysis.commits, CommitCount::Authoritative(10));
        assert_eq!(analysis.top_languages, vec!["Rust", "Shell"]);
        assert_eq!(analysis.timespan.duration_days, 400);
        assert_eq!(analysis.formatted_timespan, "1 year, 1 month");
        assert_eq!(StoryInsights::from_analysis(&analysis).contributors, 1);
    }
}
