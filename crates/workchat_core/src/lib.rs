//! WorkChat core: pure client state machines and view-model helpers.
//!
//! Nothing here performs IO. Front-ends feed [`Msg`] values through [`update`]
//! and execute the returned [`Effect`]s, reporting their outcomes back as
//! further messages.
pub mod chat;
mod effect;
pub mod files;
mod model;
mod msg;
mod state;
mod update;
mod view_model;

pub use chat::{ChatPhase, ChatState, PendingExchange};
pub use effect::Effect;
pub use files::{FilesState, Notice, NoticeLevel, UploadBatch, UploadBatchStatus};
pub use model::{
    BatchId, Category, ChatReply, ExchangeId, Failure, FailureKind, Message, Role, SourceRef,
    StoredFile, CATEGORIES, FALLBACK_REPLY,
};
pub use msg::Msg;
pub use state::AppState;
pub use update::update;
pub use view_model::{
    format_file_size, format_timestamp, AppViewModel, ChatView, FileRowView, FilesView,
    MessageView, SourceRowView, UploadProgressView, NO_INFORMATION_REPLY,
};
