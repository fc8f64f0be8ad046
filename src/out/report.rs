//! Plain-text reports for the CLI and notification channels.

use super::truncate;
use crate::archive::markdown::format_file_size;
use crate::model::{ProcessingStatistics, SyncState};
use chrono::{DateTime, Utc};
use std::fmt::Write;

const TOP_AUTHORS: usize = 5;
const NAME_WIDTH: usize = 24;

pub fn format_statistics_report(stats: &ProcessingStatistics) -> String {
    render_statistics(stats, Utc::now())
}

fn render_statistics(stats: &ProcessingStatistics, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Archiver statistics");
    let _ = writeln!(
        out,
        "  Session start:     {}",
        stats.session_start.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "  Uptime:            {}", format_uptime(now - stats.session_start));
    let _ = writeln!(out, "  Messages:          {}", stats.total_messages_processed);
    let _ = writeln!(
        out,
        "  Media downloaded:  {} ({})",
        stats.media_files_downloaded,
        format_file_size(stats.total_downloaded_size_bytes)
    );
    let _ = writeln!(out, "  Errors:            {}", stats.error_count);
    let _ = writeln!(
        out,
        "  Avg processing:    {:.1} ms",
        stats.average_processing_time_ms
    );
    let _ = writeln!(out, "  Archive files:     {}", stats.archive_files_created);
    let last_archive = stats
        .last_archive_time
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());
    let _ = writeln!(out, "  Last archive:      {}", last_archive);

    if !stats.message_type_stats.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "By type:");
        for (kind, count) in &stats.message_type_stats {
            let _ = writeln!(out, "  {:<10} {}", format!("{:?}", kind), count);
        }
    }

    if !stats.author_stats.is_empty() {
        let mut authors: Vec<_> = stats.author_stats.values().collect();
        authors.sort_by(|a, b| {
            b.message_count
                .cmp(&a.message_count)
                .then(a.author_id.cmp(&b.author_id))
        });
        let _ = writeln!(out);
        let _ = writeln!(out, "Top authors:");
        for author in authors.into_iter().take(TOP_AUTHORS) {
            let name = author
                .author_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("User {}", author.author_id));
            let _ = writeln!(
                out,
                "  {:<width$} {} msg, {} media",
                truncate(&name, NAME_WIDTH),
                author.message_count,
                author.media_count,
                width = NAME_WIDTH
            );
        }
    }

    out
}

/// One line per chat: id, status, checkpoint and last activity.
pub fn format_sync_states(states: &[SyncState]) -> String {
    if states.is_empty() {
        return "No chats tracked yet.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<16} {:<12} {:>12} {:>10}  {}",
        "CHAT", "STATUS", "LAST MSG", "TOTAL", "LAST SYNC"
    );
    for state in states {
        let last_sync = if state.last_sync_date == DateTime::<Utc>::default() {
            "never".to_string()
        } else {
            state.last_sync_date.format("%Y-%m-%d %H:%M:%S").to_string()
        };
        let _ = writeln!(
            out,
            "{:<16} {:<12} {:>12} {:>10}  {}",
            state.chat_id,
            state.status.to_string(),
            state.last_processed_message_id,
            state.total_processed_messages,
            last_sync
        );
        if let Some(err) = &state.error_message {
            let _ = writeln!(out, "  error: {}", truncate(err, 120));
        }
    }
    out
}

fn format_uptime(elapsed: chrono::Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (hours, rem) = (rem / 3600, rem % 3600);
    let minutes = rem / 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m {}s", minutes, rem % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuthorStats, MessageType, SyncStatus};
    use chrono::TimeZone;

    fn author(id: i64, name: &str, count: u64) -> AuthorStats {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        AuthorStats {
            author_id: id,
            author_name: Some(name.to_string()),
            message_count: count,
            media_count: 0,
            first_message_date: at,
            last_message_date: at,
        }
    }

    #[test]
    fn test_statistics_report() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut stats = ProcessingStatistics::new(start);
        stats.total_messages_processed = 12;
        stats.media_files_downloaded = 2;
        stats.total_downloaded_size_bytes = 1536;
        stats.average_processing_time_ms = 3.25;
        stats.message_type_stats.insert(MessageType::Text, 10);
        stats.message_type_stats.insert(MessageType::Photo, 2);
        for (id, count) in [(1, 1), (2, 7), (3, 3), (4, 1), (5, 1), (6, 2)] {
            stats
                .author_stats
                .insert(id, author(id, &format!("author{}", id), count));
        }

        let now = start + chrono::Duration::seconds(90_061);
        let report = render_statistics(&stats, now);
        assert!(report.contains("Uptime:            1d 1h 1m"));
        assert!(report.contains("Messages:          12"));
        assert!(report.contains("Media downloaded:  2 (1.5 KB)"));
        assert!(report.contains("Avg processing:    3.2 ms") || report.contains("Avg processing:    3.3 ms"));
        assert!(report.contains("Last archive:      never"));
        assert!(report.contains("  Photo      2"));

        let top: Vec<&str> = report
            .lines()
            .skip_while(|l| *l != "Top authors:")
            .skip(1)
            .collect();
        assert_eq!(top.len(), TOP_AUTHORS);
        assert!(top[0].contains("author2"));
        assert!(top[1].contains("author3"));
        assert!(top[2].contains("author6"));
    }

    #[test]
    fn test_sync_states_table() {
        assert_eq!(format_sync_states(&[]), "No chats tracked yet.\n");

        let mut failed = SyncState::new(-100);
        failed.status = SyncStatus::Error;
        failed.error_message = Some("upstream responded with status 503".into());
        let mut ok = SyncState::new(7);
        ok.last_processed_message_id = 42;
        ok.total_processed_messages = 42;
        ok.last_sync_date = Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap();

        let table = format_sync_states(&[failed, ok]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("-100"));
        assert!(lines[1].contains("error"));
        assert!(lines[1].ends_with("never"));
        assert_eq!(lines[2], "  error: upstream responded with status 503");
        assert!(lines[3].contains("42"));
        assert!(lines[3].ends_with("2024-02-03 04:05:06"));
    }

    #[test]
    fn test_uptime_formats() {
        assert_eq!(format_uptime(chrono::Duration::seconds(59)), "0m 59s");
        assert_eq!(format_uptime(chrono::Duration::seconds(3_660)), "1h 1m");
        assert_eq!(format_uptime(chrono::Duration::seconds(-5)), "0m 0s");
    }
}
