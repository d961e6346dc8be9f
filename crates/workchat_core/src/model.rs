use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub type ExchangeId = u64;
pub type BatchId = u64;

/// Text of the assistant turn appended when an exchange fails for any reason.
pub const FALLBACK_REPLY: &str = "An error has occured. Please try again!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Human,
    Assistant,
}

/// One entry of the chat log. Never mutated after it has been appended.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub sources: Option<Vec<SourceRef>>,
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
            sources: None,
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Option<Vec<SourceRef>>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            sources,
        }
    }

    pub fn fallback() -> Self {
        Self::assistant(FALLBACK_REPLY, None)
    }
}

/// A retrieved document the backend cites for an answer.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRef {
    /// Source kind reported by the backend, usually `"document"`.
    pub kind: String,
    pub label: String,
    pub scores: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: Uuid,
    pub label: &'static str,
}

/// The fixed set of categories the backend has style guides for.
pub const CATEGORIES: [Category; 3] = [
    Category {
        id: Uuid::from_u128(0x0c4cd936_a251_4366_8b8c_38942db944d5),
        label: "Industrial Sector",
    },
    Category {
        id: Uuid::from_u128(0x0c96428e_3946_48e2_bc49_c1b57f41253b),
        label: "Professional Sector",
    },
    Category {
        id: Uuid::from_u128(0xd3d8f1da_0ef0_4a15_b410_139da4fa8715),
        label: "Healthcare Sector",
    },
];

impl Category {
    pub fn by_id(id: Uuid) -> Option<Category> {
        CATEGORIES.iter().copied().find(|category| category.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub creation_time: Option<DateTime<Utc>>,
    pub content_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub response: String,
    pub sources: Option<Vec<SourceRef>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network fault, non-2xx status or an unreadable body.
    Transport,
    /// Well-formed envelope with `success: false`.
    Application,
    Timeout,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub detail: String,
}

impl Failure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FailureKind::Transport => "transport fault",
            FailureKind::Application => "request rejected",
            FailureKind::Timeout => "timed out",
            FailureKind::Cancelled => "cancelled",
        };
        if self.detail.is_empty() {
            write!(f, "{kind}")
        } else {
            write!(f, "{kind}: {}", self.detail)
        }
    }
}
