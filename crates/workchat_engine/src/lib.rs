//! WorkChat engine: HTTP transport for the backend API and the background
//! runtime that executes requests on behalf of the front-end.
mod client;
mod engine;
mod types;

pub use client::{file_name_of, ApiSettings, Backend, ReqwestBackend};
pub use engine::{EngineError, EngineHandle};
pub use types::{
    ApiError, ApiStatus, BatchId, ChatBody, ChatRequest, EngineEvent, Envelope, ExchangeId,
    FailureKind, RemoteFile, SourceKey, WireCategory, WireMessage, WireRole, WireSource,
};
