use std::path::PathBuf;

use crate::{BatchId, Category, ExchangeId, Message};

/// Side effects requested by `update`; executed by the front-end's effect runner.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send the whole log (ending with the new human turn) to the chat endpoint.
    SendChat {
        exchange_id: ExchangeId,
        category: Option<Category>,
        chats: Vec<Message>,
    },
    CancelChat { exchange_id: ExchangeId },
    FetchListing,
    UploadFile { batch_id: BatchId, path: PathBuf },
    CancelUploads { batch_id: BatchId },
    DeleteFile { name: String },
    RunIndexer,
}
