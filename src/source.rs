//! Where messages come from.
//!
//! The pipeline only needs "give me the next messages after this id". The
//! transport behind it (an API client, a bridge process, an export) is not
//! this crate's business; [`InboxSource`] is the file-backed source the CLI
//! uses, fed by whatever drops JSONL files into the inbox directory.

use crate::error::ArchiveError;
use crate::model::ChatMessage;
use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;

pub trait MessageSource: Send + Sync {
    /// Messages of `chat_id` with `id > after_id`, ascending by id, at most
    /// `limit` of them. An empty batch means there is nothing new.
    fn fetch_after(
        &self,
        chat_id: i64,
        after_id: i64,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, ArchiveError>> + Send;
}

/// Reads `<inbox>/<chat_id>.jsonl`, one JSON message per line.
#[derive(Debug, Clone)]
pub struct InboxSource {
    dir: PathBuf,
}

impl InboxSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn chat_file(&self, chat_id: i64) -> PathBuf {
        self.dir.join(format!("{}.jsonl", chat_id))
    }
}

impl MessageSource for InboxSource {
    async fn fetch_after(
        &self,
        chat_id: i64,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ArchiveError> {
        let path = self.chat_file(chat_id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No inbox file for chat {} at {}", chat_id, path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(ArchiveError::Io(e)),
        };

        let mut messages = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let msg: ChatMessage = serde_json::from_str(line).map_err(|e| {
                ArchiveError::Validation(format!("{}:{}: {}", path.display(), idx + 1, e))
            })?;
            if msg.id > after_id {
                messages.push(msg);
            }
        }

        messages.sort_by_key(|m| m.id);
        messages.dedup_by_key(|m| m.id);
        messages.truncate(limit);
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn line(id: i64) -> String {
        format!(
            r#"{{"id":{},"date":"2024-03-01T10:00:00Z","authorId":1,"authorName":"Ann","text":"m{}"}}"#,
            id, id
        )
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let tmp = tempdir().expect("tempdir");
        let source = InboxSource::new(tmp.path());
        assert!(source.fetch_after(1, 0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cursor_order_and_limit() {
        let tmp = tempdir().expect("tempdir");
        let source = InboxSource::new(tmp.path());
        let body = [line(5), String::new(), line(2), line(9), line(7), line(2)].join("\n");
        fs::write(source.chat_file(1), body).unwrap();

        let ids = |v: Vec<ChatMessage>| v.into_iter().map(|m| m.id).collect::<Vec<_>>();
        assert_eq!(ids(source.fetch_after(1, 0, 10).await.unwrap()), vec![2, 5, 7, 9]);
        assert_eq!(ids(source.fetch_after(1, 2, 2).await.unwrap()), vec![5, 7]);
        assert!(source.fetch_after(1, 9, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_line_is_permanent() {
        let tmp = tempdir().expect("tempdir");
        let source = InboxSource::new(tmp.path());
        fs::write(source.chat_file(3), format!("{}\nnot json\n", line(1))).unwrap();

        let err = source.fetch_after(3, 0, 10).await.unwrap_err();
        assert!(matches!(err, ArchiveError::Validation(ref m) if m.contains(":2:")));
        assert!(!err.is_transient());
    }
}
