//! Markdown rendering for archive files.
//!
//! A file starts with [`file_header`] and then holds one block per message
//! produced by [`format_message`]. Every block ends with a `---` separator,
//! so blocks can be appended without looking at what is already there.

use crate::model::{ChatMessage, MediaInfo, MessageType};
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};

const UNKNOWN: &str = "Unknown";

/// Characters that get a backslash in front of them. Backslash comes first so
/// the escapes added for the others are not doubled.
const MARKDOWN_SPECIALS: [char; 12] = ['\\', '*', '_', '[', ']', '(', ')', '#', '+', '-', '.', '!'];

/// Line-oriented builder for archive text.
struct MarkdownDoc {
    lines: Vec<String>,
}

impl MarkdownDoc {
    fn new() -> Self {
        Self { lines: Vec::new() }
    }

    fn line(&mut self, text: impl Into<String>) -> &mut Self {
        self.lines.push(text.into());
        self
    }

    fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    fn separator(&mut self) -> &mut Self {
        self.blank().line("---").blank()
    }

    /// Italic `*Key:* value` line.
    fn field(&mut self, key: &str, value: impl std::fmt::Display) -> &mut Self {
        self.line(format!("*{}:* {}", key, value))
    }

    /// Every line is newline-terminated.
    fn build(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    for c in text.chars() {
        if MARKDOWN_SPECIALS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Make a chat title usable as a directory name.
///
/// Path separators, characters reserved on common filesystems, control
/// characters and spaces become `_`. A blank title maps to `Unknown`.
pub fn sanitize_file_name(name: &str) -> String {
    if name.trim().is_empty() {
        return UNKNOWN.to_string();
    }
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | ' ' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = sanitized.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `1536` -> `1.5 KB`. Up to two decimals, trailing zeros dropped.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut len = bytes as f64;
    let mut order = 0;
    while len >= 1024.0 && order < UNITS.len() - 1 {
        order += 1;
        len /= 1024.0;
    }
    let mut num = format!("{:.2}", len);
    if num.contains('.') {
        let trimmed = num.trim_end_matches('0').trim_end_matches('.').len();
        num.truncate(trimmed);
    }
    format!("{} {}", num, UNITS[order])
}

/// `mm:ss` with minutes counted in total, so an hour-long voice note is `60:00`.
pub fn format_duration(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Path of `local_path` as seen from `root`, with `/` separators.
///
/// Both paths are made absolute against the current directory first; paths
/// that cannot be resolved are returned as given.
pub fn relative_media_path(root: &Path, local_path: &str) -> String {
    let target = Path::new(local_path);
    let (Ok(root), Ok(target)) = (std::path::absolute(root), std::path::absolute(target)) else {
        return local_path.replace('\\', "/");
    };
    let root = normalize(&root);
    let target = normalize(&target);

    let common = root
        .components()
        .zip(target.components())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel: Vec<String> = Vec::new();
    for _ in root.components().skip(common) {
        rel.push("..".to_string());
    }
    for part in target.components().skip(common) {
        rel.push(part.as_os_str().to_string_lossy().into_owned());
    }
    if rel.is_empty() {
        ".".to_string()
    } else {
        rel.join("/")
    }
}

/// Resolve `.` and `..` lexically.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for part in path.components() {
        match part {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Header written once when a day's file is created.
pub fn file_header(chat_title: &str, date: &DateTime<Utc>) -> String {
    let mut doc = MarkdownDoc::new();
    doc.line(format!("# {}", escape_markdown(chat_title)))
        .blank()
        .line(format!("**Date:** {}", date.format("%Y-%m-%d")))
        .separator();
    doc.build()
}

/// Render one message as a self-contained block.
///
/// Media links are written relative to `archive_root`.
pub fn format_message(message: &ChatMessage, archive_root: &Path) -> String {
    let mut doc = MarkdownDoc::new();
    let author = message
        .author_name
        .as_deref()
        .filter(|a| !a.is_empty())
        .unwrap_or(UNKNOWN);
    doc.line(format!(
        "## {} - {}",
        message.date.format("%H:%M:%S"),
        escape_markdown(author)
    ))
    .blank();

    let text = message.text.as_deref().filter(|t| !t.is_empty());
    let media = message.media.as_ref();
    let link = |m: &MediaInfo| {
        m.local_path
            .as_deref()
            .map(|p| relative_media_path(archive_root, p))
    };

    match message.kind {
        MessageType::Text => {
            if let Some(text) = text {
                doc.line(escape_markdown(text));
            }
        }
        MessageType::Photo => {
            doc.line("📷 **Photo**");
            if let Some(path) = media.and_then(link) {
                doc.line(format!("![Photo]({})", path));
            }
        }
        MessageType::Document => {
            doc.line("📄 **Document**");
            if let Some(m) = media {
                doc.field(
                    "File",
                    escape_markdown(m.file_name.as_deref().unwrap_or(UNKNOWN)),
                );
                if let Some(size) = m.file_size {
                    doc.field("Size", format_file_size(size));
                }
                if let Some(path) = link(m) {
                    doc.line(format!("[Download file]({})", path));
                }
            }
        }
        MessageType::Voice => {
            doc.line("🎵 **Voice message**");
            if let Some(m) = media {
                if let Some(secs) = m.duration {
                    doc.field("Duration", format_duration(secs));
                }
                if let Some(path) = link(m) {
                    doc.line(format!("[Audio file]({})", path));
                }
            }
        }
        MessageType::Video => {
            doc.line("🎬 **Video**");
            if let Some(m) = media {
                if let Some(secs) = m.duration {
                    doc.field("Duration", format_duration(secs));
                }
                if let (Some(w), Some(h)) = (m.width, m.height) {
                    doc.field("Resolution", format!("{}x{}", w, h));
                }
                if let Some(path) = link(m) {
                    doc.line(format!("[Video file]({})", path));
                }
            }
        }
        MessageType::Sticker => {
            doc.line("😄 **Sticker**");
            if let Some(path) = media.and_then(link) {
                doc.line(format!("![Sticker]({})", path));
            }
        }
        MessageType::Poll | MessageType::Unknown => {
            doc.line("❓ **Unknown message type**");
            if let Some(text) = text {
                doc.line(escape_markdown(text));
            }
        }
    }

    if message.kind.is_media() {
        if let Some(text) = text {
            doc.field("Caption", escape_markdown(text));
        }
    }

    if let Some(reply_to) = message.reply_to_message_id {
        doc.line(format!("*↩️ Reply to message ID: {}*", reply_to));
    }
    if message.is_edited {
        match message.edit_date {
            Some(at) => doc.line(format!("*✏️ Edited: {}*", at.format("%H:%M:%S"))),
            None => doc.line("*✏️ Edited*"),
        };
    }
    if let Some(fwd) = &message.forward_info {
        let from = escape_markdown(fwd.from_name.as_deref().unwrap_or(UNKNOWN));
        match fwd.original_date {
            Some(at) => doc.line(format!(
                "*📤 Forwarded from: {} ({})*",
                from,
                at.format("%H:%M:%S")
            )),
            None => doc.line(format!("*📤 Forwarded from: {}*", from)),
        };
    }

    doc.separator();
    doc.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ForwardInfo;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_escape_each_special_once() {
        assert_eq!(escape_markdown("a*b_c[d]!"), r"a\*b\_c\[d\]\!");
        assert_eq!(escape_markdown(r"x\y"), r"x\\y");
        assert_eq!(escape_markdown("1+1-2.(#)"), r"1\+1\-2\.\(\#\)");
        assert_eq!(escape_markdown("plain"), "plain");
        assert_eq!(escape_markdown(""), "");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("My Chat"), "My_Chat");
        assert_eq!(sanitize_file_name("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_file_name("what?*"), "what__");
        assert_eq!(sanitize_file_name(""), "Unknown");
        assert_eq!(sanitize_file_name("   "), "Unknown");
        assert_eq!(sanitize_file_name(".."), "Unknown");
        assert_eq!(sanitize_file_name("Чат 🚀"), "Чат_🚀");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
        assert_eq!(format_file_size(1u64 << 50), "1024 TB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(75), "01:15");
        assert_eq!(format_duration(3600), "60:00");
    }

    #[test]
    fn test_relative_media_path() {
        let root = Path::new("/data/archives");
        assert_eq!(
            relative_media_path(root, "/data/archives/media/a.jpg"),
            "media/a.jpg"
        );
        assert_eq!(
            relative_media_path(root, "/data/media/a.jpg"),
            "../media/a.jpg"
        );
        assert_eq!(
            relative_media_path(root, "/data/archives/x/../y/b.png"),
            "y/b.png"
        );
    }

    #[test]
    fn test_file_header() {
        let header = file_header("Dev-Team", &at(10, 0, 0));
        assert_eq!(header, "# Dev\\-Team\n\n**Date:** 2024-03-01\n\n---\n\n");
    }

    #[test]
    fn test_text_block() {
        let msg = ChatMessage::text(1, at(9, 5, 7), 1, "Ann", "hello.");
        let block = format_message(&msg, Path::new("/a"));
        assert_eq!(block, "## 09:05:07 - Ann\n\nhello\\.\n\n---\n\n");
    }

    #[test]
    fn test_missing_author_is_unknown() {
        let mut msg = ChatMessage::text(1, at(9, 0, 0), 1, "", "hi");
        msg.author_name = None;
        assert!(format_message(&msg, Path::new("/a")).starts_with("## 09:00:00 - Unknown\n"));
    }

    #[test]
    fn test_document_block() {
        let mut msg = ChatMessage::text(2, at(12, 0, 0), 1, "Bob", "specs");
        msg.kind = MessageType::Document;
        msg.media = Some(MediaInfo {
            file_name: Some("report_v2.pdf".into()),
            file_size: Some(2048),
            local_path: Some("/a/media/report.pdf".into()),
            ..MediaInfo::default()
        });
        let block = format_message(&msg, Path::new("/a"));
        assert!(block.contains("📄 **Document**\n"));
        assert!(block.contains("*File:* report\\_v2\\.pdf\n"));
        assert!(block.contains("*Size:* 2 KB\n"));
        assert!(block.contains("[Download file](media/report.pdf)\n"));
        assert!(block.contains("*Caption:* specs\n"));
    }

    #[test]
    fn test_video_and_voice_details() {
        let mut video = ChatMessage::text(3, at(12, 0, 0), 1, "Bob", "");
        video.kind = MessageType::Video;
        video.media = Some(MediaInfo {
            duration: Some(95),
            width: Some(1280),
            height: Some(720),
            ..MediaInfo::default()
        });
        let block = format_message(&video, Path::new("/a"));
        assert!(block.contains("*Duration:* 01:35\n"));
        assert!(block.contains("*Resolution:* 1280x720\n"));
        assert!(!block.contains("Caption"));

        let mut voice = video.clone();
        voice.kind = MessageType::Voice;
        let block = format_message(&voice, Path::new("/a"));
        assert!(block.contains("🎵 **Voice message**\n"));
        assert!(!block.contains("Resolution"));
    }

    #[test]
    fn test_poll_uses_fallback() {
        let mut msg = ChatMessage::text(4, at(12, 0, 0), 1, "Bob", "Lunch?");
        msg.kind = MessageType::Poll;
        let block = format_message(&msg, Path::new("/a"));
        assert!(block.contains("❓ **Unknown message type**\nLunch?\n"));
    }

    #[test]
    fn test_trailers() {
        let mut msg = ChatMessage::text(5, at(12, 0, 0), 1, "Bob", "ok");
        msg.reply_to_message_id = Some(4);
        msg.is_edited = true;
        msg.edit_date = Some(at(12, 30, 0));
        msg.forward_info = Some(ForwardInfo {
            from_name: Some("Carol".into()),
            original_date: Some(at(8, 0, 0)),
            ..ForwardInfo::default()
        });
        let block = format_message(&msg, Path::new("/a"));
        assert!(block.contains("*↩️ Reply to message ID: 4*\n"));
        assert!(block.contains("*✏️ Edited: 12:30:00*\n"));
        assert!(block.contains("*📤 Forwarded from: Carol (08:00:00)*\n"));
        assert!(block.ends_with("\n\n---\n\n"));
    }
}
