//! Date-partitioned Markdown archive.
//!
//! Messages land in `<root>/<sanitized chat title>/<yyyy-MM-dd>.md`, where the
//! date comes from the message itself. The first write to a file also writes
//! the header, and a file never exists without it.

pub mod markdown;

use crate::error::ArchiveError;
use crate::model::ChatMessage;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// Result of a single append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    pub path: PathBuf,
    /// The file did not exist before this append.
    pub created: bool,
}

/// Appends formatted messages to archive files.
///
/// Writers to the same file are serialized through a per-path lock, so the
/// create-or-append decision and the write itself happen as one step.
/// Different files are written independently.
pub struct ArchiveWriter {
    root: PathBuf,
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl ArchiveWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_path(&self, chat_title: &str, date: &DateTime<Utc>) -> PathBuf {
        self.root
            .join(markdown::sanitize_file_name(chat_title))
            .join(format!("{}.md", date.format("%Y-%m-%d")))
    }

    pub async fn append_message(
        &self,
        message: &ChatMessage,
        chat_title: &str,
    ) -> Result<AppendOutcome, ArchiveError> {
        let path = self.file_path(chat_title, &message.date);
        let header = markdown::file_header(chat_title, &message.date);
        let block = markdown::format_message(message, &self.root);

        let lock = self.lock_for(&path);
        let guard = lock.lock().await;
        let target = path.clone();
        let written =
            tokio::task::spawn_blocking(move || append_block(&target, &header, &block)).await;
        drop(guard);
        self.release_lock(&path, lock);

        let created = written.map_err(|e| ArchiveError::persistence(&path, io::Error::other(e)))??;
        if created {
            log::info!("Created archive file {}", path.display());
        }
        log::debug!("Appended message {} to {}", message.id, path.display());
        Ok(AppendOutcome { path, created })
    }

    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }

    /// Forget the lock for `path` once nobody else holds or waits on it.
    fn release_lock(&self, path: &Path, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        // Clones are only taken under `locks`, so 2 means the map and us.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(path);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

/// Append `block` to `path`, creating the file with `header` first if needed.
///
/// A new file appears complete or not at all: header and block go to a temp
/// file that is then linked into place without overwriting. Returns whether
/// the file was created.
fn append_block(path: &Path, header: &str, block: &str) -> Result<bool, ArchiveError> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(|e| ArchiveError::persistence(dir, e))?;

    if !path.exists() {
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ArchiveError::persistence(dir, e))?;
        let fill = |tmp: &mut NamedTempFile| -> io::Result<()> {
            tmp.write_all(header.as_bytes())?;
            tmp.write_all(block.as_bytes())?;
            tmp.as_file().sync_data()
        };
        fill(&mut tmp).map_err(|e| ArchiveError::persistence(path, e))?;
        match tmp.persist_noclobber(path) {
            Ok(_) => return Ok(true),
            // Another process created it first; fall through and append.
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(ArchiveError::persistence(path, e.error)),
        }
    }

    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| ArchiveError::persistence(path, e))?;
    file.write_all(block.as_bytes())
        .map_err(|e| ArchiveError::persistence(path, e))?;
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MediaInfo, MessageType};
    use chrono::TimeZone;
    use futures::future::join_all;
    use tempfile::tempdir;

    fn msg(id: i64, day: u32, hour: u32) -> ChatMessage {
        let date = Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap();
        ChatMessage::text(id, date, 1, "Ann", &format!("message {}", id))
    }

    #[test]
    fn test_file_path_is_pure() {
        let writer = ArchiveWriter::new("/archives");
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 0).unwrap();
        assert_eq!(
            writer.file_path("Team Chat", &date),
            PathBuf::from("/archives/Team_Chat/2024-03-01.md")
        );
        assert_eq!(
            writer.file_path("", &date),
            PathBuf::from("/archives/Unknown/2024-03-01.md")
        );
    }

    #[tokio::test]
    async fn test_header_written_once() {
        let tmp = tempdir().expect("tempdir");
        let writer = ArchiveWriter::new(tmp.path());

        let first = writer.append_message(&msg(1, 1, 9), "Team").await.unwrap();
        let second = writer.append_message(&msg(2, 1, 10), "Team").await.unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.path, second.path);

        let content = fs::read_to_string(&first.path).unwrap();
        assert!(content.starts_with("# Team\n\n**Date:** 2024-03-01\n\n---\n\n## 09:00:00 - Ann"));
        assert_eq!(content.matches("# Team").count(), 1);
        assert_eq!(content.matches("\n## ").count(), 2);
    }

    #[tokio::test]
    async fn test_messages_partitioned_by_own_date() {
        let tmp = tempdir().expect("tempdir");
        let writer = ArchiveWriter::new(tmp.path());

        let a = writer.append_message(&msg(1, 1, 23), "Team").await.unwrap();
        let b = writer.append_message(&msg(2, 2, 0), "Team").await.unwrap();
        assert!(a.created && b.created);
        assert!(a.path.ends_with("Team/2024-03-01.md"));
        assert!(b.path.ends_with("Team/2024-03-02.md"));
    }

    #[tokio::test]
    async fn test_concurrent_appends_do_not_interleave() {
        let tmp = tempdir().expect("tempdir");
        let writer = Arc::new(ArchiveWriter::new(tmp.path()));
        const N: i64 = 64;

        let tasks = (1..=N).map(|id| {
            let writer = Arc::clone(&writer);
            tokio::spawn(async move { writer.append_message(&msg(id, 5, 12), "Busy").await })
        });
        let outcomes: Vec<AppendOutcome> = join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();

        assert_eq!(outcomes.iter().filter(|o| o.created).count(), 1);

        assert_eq!(writer.tracked_locks(), 0);

        let content = fs::read_to_string(&outcomes[0].path).unwrap();
        assert_eq!(content.matches("**Date:**").count(), 1);
        assert_eq!(content.matches("## 12:00:00 - Ann").count(), N as usize);
        for id in 1..=N {
            assert_eq!(
                content.matches(&format!("message {}\n", id)).count(),
                1,
                "message {} missing or duplicated",
                id
            );
        }
    }

    #[tokio::test]
    async fn test_media_link_relative_to_root() {
        let tmp = tempdir().expect("tempdir");
        let writer = ArchiveWriter::new(tmp.path());
        let mut photo = msg(1, 1, 9);
        photo.kind = MessageType::Photo;
        photo.media = Some(MediaInfo {
            local_path: Some(tmp.path().join("media/p.jpg").to_string_lossy().into_owned()),
            ..MediaInfo::default()
        });

        let out = writer.append_message(&photo, "Pics").await.unwrap();
        let content = fs::read_to_string(out.path).unwrap();
        assert!(content.contains("![Photo](media/p.jpg)"));
    }

    #[tokio::test]
    async fn test_locks_are_released_after_each_day() {
        let tmp = tempdir().expect("tempdir");
        let writer = ArchiveWriter::new(tmp.path());
        for day in 1..=20 {
            writer.append_message(&msg(day as i64, day, 8), "Daily").await.unwrap();
        }
        assert_eq!(writer.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_failed_create_leaves_no_partial_file() {
        let tmp = tempdir().expect("tempdir");
        let writer = ArchiveWriter::new(tmp.path());
        let target = writer.file_path("Team", &msg(1, 1, 9).date);

        // A non-empty directory squatting on the day file's name.
        fs::create_dir_all(target.join("squat")).unwrap();
        assert!(writer.append_message(&msg(1, 1, 9), "Team").await.is_err());
        let entries: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("2024-03-01.md")]);
        assert_eq!(writer.tracked_locks(), 0);

        fs::remove_dir_all(&target).unwrap();
        let out = writer.append_message(&msg(2, 1, 10), "Team").await.unwrap();
        assert!(out.created);
        let content = fs::read_to_string(&target).unwrap();
        assert!(content.starts_with("# Team\n\n**Date:** 2024-03-01\n"));
        assert_eq!(content.matches("\n## ").count(), 1);
    }
}
