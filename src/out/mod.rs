pub mod report;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};

/// Output mode for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    /// No output
    None,
    /// Human-readable text (default)
    #[default]
    Text,
    /// JSON output
    Json,
}

impl OutputMode {
    pub fn is_json(&self) -> bool {
        matches!(self, OutputMode::Json)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, OutputMode::None)
    }
}

/// Print `text` unless output is disabled, or `value` as JSON in JSON mode.
pub fn emit<T: Serialize>(mode: OutputMode, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    emit_to(&mut io::stdout().lock(), mode, value, text)
}

fn emit_to<W: Write, T: Serialize>(
    w: &mut W,
    mode: OutputMode,
    value: &T,
    text: impl FnOnce() -> String,
) -> Result<()> {
    match mode {
        OutputMode::None => return Ok(()),
        OutputMode::Json => writeln!(w, "{}", serde_json::to_string_pretty(value)?)?,
        OutputMode::Text => write!(w, "{}", text())?,
    }
    w.flush()?;
    Ok(())
}

/// Truncate a string to `max` characters, ending with an ellipsis when cut.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    match max {
        0 => String::new(),
        1 => "…".to_string(),
        _ => {
            let end = s
                .char_indices()
                .nth(max - 1)
                .map(|(i, _)| i)
                .unwrap_or(s.len());
            format!("{}…", &s[..end])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hell…");
        assert_eq!(truncate("🚀🚀🚀🚀", 3), "🚀🚀…");
        assert_eq!(truncate("ab", 1), "…");
        assert_eq!(truncate("ab", 0), "");
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_emit_modes() {
        let value = serde_json::json!({ "name": "tgarchiver" });

        let mut buf = Vec::new();
        emit_to(&mut buf, OutputMode::Json, &value, || unreachable!()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "{\n  \"name\": \"tgarchiver\"\n}\n");

        let mut buf = Vec::new();
        emit_to(&mut buf, OutputMode::Text, &value, || "plain\n".to_string()).unwrap();
        assert_eq!(buf, b"plain\n");

        let mut buf = Vec::new();
        emit_to(&mut buf, OutputMode::None, &value, || unreachable!()).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_emit_reports_write_errors() {
        let value = serde_json::json!({ "version": "0.1.0" });
        assert!(emit_to(&mut ClosedPipe, OutputMode::Json, &value, String::new).is_err());
        assert!(emit_to(&mut ClosedPipe, OutputMode::Text, &value, || "x".into()).is_err());
    }
}
