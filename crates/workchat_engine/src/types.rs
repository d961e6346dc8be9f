use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ExchangeId = u64;
pub type BatchId = u64;

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub body: Option<T>,
    pub msg: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    Human,
    #[serde(rename = "ai")]
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<WireSource>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCategory {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub category: Option<WireCategory>,
    pub chats: Vec<WireMessage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatBody {
    pub response: String,
    #[serde(default)]
    pub sources: Option<Vec<WireSource>>,
}

/// One cited source, wire contract v1: `[[kind, title], [score, ...]]`.
///
/// The server groups retrieved chunks by `(kind, title)` and reports every
/// chunk score for that document. Serialized back in the same shape when the
/// history is replayed to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSource(pub SourceKey, pub Vec<f64>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceKey(pub String, pub String);

impl WireSource {
    pub fn new(kind: impl Into<String>, title: impl Into<String>, scores: Vec<f64>) -> Self {
        Self(SourceKey(kind.into(), title.into()), scores)
    }

    pub fn kind(&self) -> &str {
        &self.0 .0
    }

    pub fn title(&self) -> &str {
        &self.0 .1
    }

    pub fn scores(&self) -> &[f64] {
        &self.1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content_md5: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiStatus {
    pub status: i64,
}

/// Completion notifications delivered by the engine thread.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ChatCompleted {
        exchange_id: ExchangeId,
        result: Result<ChatBody, ApiError>,
    },
    ListingCompleted {
        result: Result<Vec<RemoteFile>, ApiError>,
    },
    UploadCompleted {
        batch_id: BatchId,
        file_name: String,
        result: Result<(), ApiError>,
    },
    DeleteCompleted {
        name: String,
        result: Result<(), ApiError>,
    },
    IndexerCompleted {
        result: Result<(), ApiError>,
    },
    StatusCompleted {
        result: Result<ApiStatus, ApiError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "request cancelled")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidRequest,
    HttpStatus(u16),
    Timeout,
    Network,
    MalformedBody,
    /// The server answered with `success: false`.
    Application,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidRequest => write!(f, "invalid request"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::MalformedBody => write!(f, "malformed response body"),
            FailureKind::Application => write!(f, "request rejected by server"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_fields_may_be_absent() {
        let envelope: Envelope<ChatBody> = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.body, None);
        assert_eq!(envelope.msg, None);

        let envelope: Envelope<Vec<RemoteFile>> =
            serde_json::from_str(r#"{"success": false, "msg": "Not allowed"}"#).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.msg.as_deref(), Some("Not allowed"));
    }
}
