use std::path::PathBuf;

use crate::{BatchId, Category, ChatReply, ExchangeId, Failure, StoredFile};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User edited the chat input box.
    DraftChanged(String),
    /// User pressed send; submits the current draft.
    SendClicked,
    /// User picked a category, or cleared the selection.
    CategorySelected(Option<Category>),
    /// User asked to wipe the conversation.
    ClearChatClicked,
    /// User gave up waiting on the pending exchange.
    CancelChatClicked,
    /// Backend answered (or failed to answer) an exchange.
    ChatResponded {
        exchange_id: ExchangeId,
        result: Result<ChatReply, Failure>,
    },
    /// The file page became visible; fetch the listing if it is stale.
    FilesOpened,
    /// User explicitly asked for a fresh listing.
    RefreshFilesClicked,
    /// Listing request finished.
    ListingFetched(Result<Vec<StoredFile>, Failure>),
    /// User picked a set of files to upload as one batch.
    UploadFilesChosen(Vec<PathBuf>),
    /// User aborted the in-flight batch.
    CancelUploadsClicked,
    /// One upload of a batch finished.
    UploadFinished {
        batch_id: BatchId,
        file_name: String,
        result: Result<(), Failure>,
    },
    DeleteFileClicked(String),
    DeleteFinished {
        name: String,
        result: Result<(), Failure>,
    },
    RunIndexerClicked,
    IndexerFinished(Result<(), Failure>),
}
