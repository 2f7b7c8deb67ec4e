use unicode_width::UnicodeWidthStr;

use crate::analyze::RecommendationReport;
use crate::db::models::*;
use crate::pipeline::RunReport;

/// Format a count with thousands separators.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Truncate a string to fit within max_width (respecting unicode width).
fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + cw + 3 > max_width {
            result.push_str("...");
            break;
        }
        result.push(ch);
        width += cw;
    }
    result
}

/// Pad to a display width; `{:<n}` counts chars, not columns.
fn pad(s: &str, width: usize) -> String {
    let truncated = truncate(s, width);
    let used = UnicodeWidthStr::width(truncated.as_str());
    format!("{truncated}{}", " ".repeat(width.saturating_sub(used)))
}

pub fn print_report(report: &RecommendationReport) {
    println!("Recommendations\n");

    println!("  Suggested keywords:");
    if report.suggested_keywords.is_empty() {
        println!("    (none)");
    } else {
        println!("    {}", report.suggested_keywords.join(", "));
    }

    let days = if report.best_days.is_empty() {
        "(none)".to_string()
    } else {
        report.best_days.join(", ")
    };
    let hours = if report.best_hours.is_empty() {
        "(none)".to_string()
    } else {
        report
            .best_hours
            .iter()
            .map(|h| format!("{h:02}:00"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!("\n  Best days to publish:  {days}");
    println!("  Best hours to publish: {hours}");

    println!("\n  Most engaging titles:");
    for (i, title) in report.engaging_titles.iter().enumerate() {
        println!("    {}. {}", i + 1, truncate(title, 70));
    }
}

pub fn print_run(run: &RunReport) {
    println!(
        "Run #{} for {}: {} ({:.1}s)",
        run.run_id,
        run.channel_id,
        run.status.as_str(),
        run.duration_secs
    );
    println!(
        "  Videos: {}  New: {}  Updated: {}\n",
        run.videos_found, run.upsert.inserted, run.upsert.updated
    );
    if let Some(ref report) = run.report {
        print_report(report);
    }
}

pub fn print_video_list(videos: &[StoredVideo]) {
    if videos.is_empty() {
        println!("No videos stored yet. Run `yts run` first.");
        return;
    }

    println!(
        "  {} {:<12} {:>12} {:>9} {:>9}  {}",
        pad("TITLE", 44),
        "PUBLISHED",
        "VIEWS",
        "LIKES",
        "COMMENTS",
        "ID"
    );
    println!("  {}", "-".repeat(102));

    for v in videos {
        let published = v.published_at.get(..10).unwrap_or(&v.published_at);
        println!(
            "  {} {:<12} {:>12} {:>9} {:>9}  {}",
            pad(&v.title, 44),
            published,
            format_count(v.views),
            format_count(v.likes),
            format_count(v.comments),
            v.video_id
        );
    }

    println!(
        "\n{} video{}",
        videos.len(),
        if videos.len() == 1 { "" } else { "s" }
    );
}

pub fn print_video_detail(v: &StoredVideo) {
    println!("{}", v.title);
    println!("  ID:          {}", v.video_id);
    println!("  Published:   {}", v.published_at);
    println!("  Views:       {}", format_count(v.views));
    println!("  Likes:       {}", format_count(v.likes));
    println!("  Comments:    {}", format_count(v.comments));
    println!("  Recorded:    {}", v.recorded_at);
}

pub fn print_runs(runs: &[PipelineRun]) {
    if runs.is_empty() {
        println!("No pipeline runs recorded.");
        return;
    }

    println!(
        "  {:>5} {:<26} {:<21} {:<10} {:>6} {:>5} {:>7}",
        "RUN", "CHANNEL", "STARTED", "STATUS", "VIDEOS", "NEW", "UPDATED"
    );
    println!("  {}", "-".repeat(88));

    for r in runs {
        println!(
            "  {:>5} {} {:<21} {:<10} {:>6} {:>5} {:>7}",
            r.id,
            pad(&r.channel_id, 26),
            r.started_at,
            r.status,
            r.videos_found,
            r.inserted,
            r.updated
        );
        if let Some(ref err) = r.error {
            println!("        error: {}", truncate(err, 80));
        }
    }
}

pub fn print_stats(stats: &DbStats) {
    println!("Database Statistics\n");
    println!("  Videos:          {}", stats.videos);
    println!("  Total views:     {}", format_count(stats.total_views.max(0) as u64));
    println!("  Total likes:     {}", format_count(stats.total_likes.max(0) as u64));
    println!("  Total comments:  {}", format_count(stats.total_comments.max(0) as u64));
    println!(
        "  Last recorded:   {}",
        stats.last_recorded_at.as_deref().unwrap_or("never")
    );
    println!("  Pipeline runs:   {} ({} failed)", stats.runs, stats.failed_runs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_get_thousands_separators() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(12_345_678), "12,345,678");
    }

    #[test]
    fn long_titles_are_truncated_to_width() {
        let t = truncate("An extremely long video title that keeps going", 20);
        assert!(t.ends_with("..."));
        assert!(UnicodeWidthStr::width(t.as_str()) <= 20);
        assert_eq!(UnicodeWidthStr::width(pad("short", 10).as_str()), 10);
    }
}
