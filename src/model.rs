//! Data types shared by the pipeline: incoming messages, per-chat sync
//! checkpoints and processing statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum MessageType {
    #[default]
    Text,
    Photo,
    Document,
    Voice,
    Video,
    Sticker,
    Poll,
    #[serde(other)]
    Unknown,
}

impl MessageType {
    pub fn is_media(&self) -> bool {
        matches!(
            self,
            MessageType::Photo
                | MessageType::Document
                | MessageType::Voice
                | MessageType::Video
                | MessageType::Sticker
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaInfo {
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
    /// Path of the downloaded file, if it was fetched.
    pub local_path: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Duration in seconds for audio and video.
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForwardInfo {
    pub from_name: Option<String>,
    pub from_id: Option<i64>,
    pub from_chat: Option<String>,
    pub original_date: Option<DateTime<Utc>>,
    pub original_message_id: Option<i64>,
}

/// A single chat message as handed over by the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub author_id: i64,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    #[serde(default)]
    pub media: Option<MediaInfo>,
    #[serde(default)]
    pub reply_to_message_id: Option<i64>,
    #[serde(default)]
    pub forward_info: Option<ForwardInfo>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub edit_date: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Plain text message, the common case in tests and fixtures.
    #[cfg(test)]
    pub fn text(id: i64, date: DateTime<Utc>, author_id: i64, author: &str, text: &str) -> Self {
        ChatMessage {
            id,
            date,
            author_id,
            author_name: Some(author.to_string()),
            text: Some(text.to_string()),
            kind: MessageType::Text,
            media: None,
            reply_to_message_id: None,
            forward_info: None,
            is_edited: false,
            edit_date: None,
        }
    }

    /// Size of the locally downloaded media file, if there is one.
    pub fn downloaded_media_size(&self) -> Option<u64> {
        let media = self.media.as_ref()?;
        media.local_path.as_ref()?;
        media.file_size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncStatus {
    #[default]
    Idle,
    InProgress,
    Error,
    Paused,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncStatus::Idle => "idle",
            SyncStatus::InProgress => "in progress",
            SyncStatus::Error => "error",
            SyncStatus::Paused => "paused",
        };
        f.write_str(s)
    }
}

/// Durable ingestion checkpoint for one chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub chat_id: i64,
    pub last_processed_message_id: i64,
    pub last_sync_date: DateTime<Utc>,
    pub total_processed_messages: u64,
    pub last_full_sync_date: Option<DateTime<Utc>>,
    pub status: SyncStatus,
    pub error_message: Option<String>,
}

impl SyncState {
    /// Fresh state for a chat that has never been synced.
    pub fn new(chat_id: i64) -> Self {
        SyncState {
            chat_id,
            last_processed_message_id: 0,
            last_sync_date: DateTime::<Utc>::default(),
            total_processed_messages: 0,
            last_full_sync_date: None,
            status: SyncStatus::Idle,
            error_message: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorStats {
    pub author_id: i64,
    pub author_name: Option<String>,
    pub message_count: u64,
    pub media_count: u64,
    pub first_message_date: DateTime<Utc>,
    pub last_message_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingStatistics {
    pub session_start: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub total_messages_processed: u64,
    pub media_files_downloaded: u64,
    pub total_downloaded_size_bytes: u64,
    pub error_count: u64,
    pub average_processing_time_ms: f64,
    pub message_type_stats: BTreeMap<MessageType, u64>,
    pub author_stats: BTreeMap<i64, AuthorStats>,
    pub last_archive_time: Option<DateTime<Utc>>,
    pub archive_files_created: u64,
}

impl ProcessingStatistics {
    pub fn new(now: DateTime<Utc>) -> Self {
        ProcessingStatistics {
            session_start: now,
            last_update: now,
            total_messages_processed: 0,
            media_files_downloaded: 0,
            total_downloaded_size_bytes: 0,
            error_count: 0,
            average_processing_time_ms: 0.0,
            message_type_stats: BTreeMap::new(),
            author_stats: BTreeMap::new(),
            last_archive_time: None,
            archive_files_created: 0,
        }
    }
}

impl Default for ProcessingStatistics {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_state_json_field_names() {
        let state = SyncState::new(42);
        let json = serde_json::to_value(&state).unwrap();
        for key in [
            "chatId",
            "lastProcessedMessageId",
            "lastSyncDate",
            "totalProcessedMessages",
            "lastFullSyncDate",
            "status",
            "errorMessage",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["status"], "Idle");
        assert!(json["lastFullSyncDate"].is_null());
    }

    #[test]
    fn test_message_from_jsonl_line() {
        let line = r#"{"id":7,"date":"2024-03-01T10:15:00Z","authorId":5,"authorName":"Ann","type":"Photo","media":{"fileName":"a.jpg","fileSize":2048,"localPath":"media/a.jpg"}}"#;
        let msg: ChatMessage = serde_json::from_str(line).unwrap();
        assert_eq!(msg.id, 7);
        assert_eq!(msg.kind, MessageType::Photo);
        assert_eq!(msg.downloaded_media_size(), Some(2048));
        assert!(msg.text.is_none());
    }

    #[test]
    fn test_unrecognized_type_is_unknown() {
        let line = r#"{"id":1,"date":"2024-03-01T10:15:00Z","type":"Quiz"}"#;
        let msg: ChatMessage = serde_json::from_str(line).unwrap();
        assert_eq!(msg.kind, MessageType::Unknown);
    }

    #[test]
    fn test_statistics_map_keys() {
        let mut stats = ProcessingStatistics::default();
        stats.message_type_stats.insert(MessageType::Photo, 3);
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains(r#""Photo":3"#));
        let back: ProcessingStatistics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message_type_stats.get(&MessageType::Photo), Some(&3));
    }
}
