use chrono::{DateTime, Utc};

use crate::chat::ChatPhase;
use crate::{AppState, Category, Message, Role, SourceRef, StoredFile};

/// The backend's canned answer when retrieval found nothing; its sources are
/// noise and are not shown.
pub const NO_INFORMATION_REPLY: &str =
    "I was unable to find any information on the topic. Please contact the Bid Management team";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub chat: ChatView,
    pub files: FilesView,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatView {
    pub phase: ChatPhase,
    pub messages: Vec<MessageView>,
    pub draft: String,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    pub role: Role,
    pub content: String,
    /// Empty when the message has no sources or they should stay hidden.
    pub sources: Vec<SourceRowView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRowView {
    pub label: String,
    pub scores: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilesView {
    pub files: Vec<FileRowView>,
    pub stale: bool,
    pub refreshing: bool,
    pub upload: Option<UploadProgressView>,
    pub indexer_running: bool,
    pub listing_revision: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRowView {
    pub name: String,
    pub size: String,
    pub created: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgressView {
    pub total: usize,
    pub done: usize,
    pub failed: usize,
}

impl AppViewModel {
    pub(crate) fn build(state: &AppState, dirty: bool) -> Self {
        let chat = state.chat();
        let files = state.files();
        Self {
            chat: ChatView {
                phase: chat.phase(),
                messages: chat.log().iter().map(message_view).collect(),
                draft: chat.draft().to_string(),
                category: chat.category(),
            },
            files: FilesView {
                files: files.files().map(file_row_view).collect(),
                stale: files.is_stale(),
                refreshing: files.is_listing_in_flight(),
                upload: files.batch().map(|batch| UploadProgressView {
                    total: batch.status.total,
                    done: batch.status.done,
                    failed: batch.failed.len(),
                }),
                indexer_running: files.is_indexer_running(),
                listing_revision: files.listing_revision(),
            },
            dirty,
        }
    }
}

fn message_view(message: &Message) -> MessageView {
    let hide = message
        .content
        .to_lowercase()
        .contains(&NO_INFORMATION_REPLY.to_lowercase());
    let sources = match (&message.sources, hide) {
        (Some(sources), false) => sources.iter().map(source_row_view).collect(),
        _ => Vec::new(),
    };
    MessageView {
        role: message.role,
        content: message.content.clone(),
        sources,
    }
}

fn source_row_view(source: &SourceRef) -> SourceRowView {
    SourceRowView {
        label: source.label.clone(),
        scores: source
            .scores
            .iter()
            .map(|score| format!("{score:.5}"))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn file_row_view(file: &StoredFile) -> FileRowView {
    FileRowView {
        name: file.name.clone(),
        size: format_file_size(file.size, true, 1),
        created: file
            .creation_time
            .as_ref()
            .map(format_timestamp)
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

/// Human-readable byte count. `si` selects powers of 1000 (kB, MB, ...) over
/// powers of 1024 (KiB, MiB, ...).
pub fn format_file_size(bytes: u64, si: bool, decimals: usize) -> String {
    let thresh = if si { 1000.0 } else { 1024.0 };
    let mut value = bytes as f64;
    if value < thresh {
        return format!("{bytes} B");
    }

    let units: [&str; 8] = if si {
        ["kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"]
    } else {
        ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"]
    };
    let r = 10f64.powi(decimals as i32);
    let mut unit = 0;
    value /= thresh;
    while (value * r).round() / r >= thresh && unit < units.len() - 1 {
        value /= thresh;
        unit += 1;
    }

    format!("{value:.decimals$} {}", units[unit])
}

/// `dd/mm/yyyy h:mm:ss am`, in UTC.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%d/%m/%Y %-I:%M:%S %P").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_sizes_use_si_units() {
        assert_eq!(format_file_size(999, true, 1), "999 B");
        assert_eq!(format_file_size(1000, true, 1), "1.0 kB");
        assert_eq!(format_file_size(1_500_000, true, 1), "1.5 MB");
        // Rounds up into the next unit instead of printing "1000.0 kB".
        assert_eq!(format_file_size(999_990, true, 1), "1.0 MB");
        assert_eq!(format_file_size(2048, false, 1), "2.0 KiB");
    }

    #[test]
    fn timestamps_use_day_first_twelve_hour_clock() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 7, 15, 4, 5).unwrap();
        assert_eq!(format_timestamp(&ts), "07/03/2024 3:04:05 pm");
    }
}
