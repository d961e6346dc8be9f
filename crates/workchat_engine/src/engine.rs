use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc as async_mpsc;
use tokio_util::sync::CancellationToken;
use workchat_logging::{wc_debug, wc_info};

use crate::client::{file_name_of, ApiSettings, Backend, ReqwestBackend};
use crate::{ApiError, BatchId, ChatRequest, EngineEvent, ExchangeId};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("backend settings rejected: {0}")]
    Settings(#[from] ApiError),
    #[error("cannot start engine runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CancelKey {
    Exchange(ExchangeId),
    Batch(BatchId),
}

#[derive(Debug)]
enum Request {
    Chat {
        exchange_id: ExchangeId,
        request: ChatRequest,
    },
    ListFiles,
    Upload {
        batch_id: BatchId,
        path: PathBuf,
    },
    Delete {
        name: String,
    },
    RunIndexer,
    Status,
}

impl Request {
    fn cancel_key(&self) -> Option<CancelKey> {
        match self {
            Request::Chat { exchange_id, .. } => Some(CancelKey::Exchange(*exchange_id)),
            Request::Upload { batch_id, .. } => Some(CancelKey::Batch(*batch_id)),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum EngineCommand {
    Submit(Request),
    Cancel(CancelKey),
}

/// Owns the background runtime that performs every backend request.
///
/// Requests run concurrently; each completion is reported once through
/// [`EngineHandle::try_recv`]. Dropping the handle cancels whatever is still
/// outstanding.
pub struct EngineHandle {
    cmd_tx: async_mpsc::UnboundedSender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    cancel_all: CancellationToken,
    worker: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    pub fn new(settings: ApiSettings) -> Result<Self, EngineError> {
        let backend = ReqwestBackend::new(settings)?;
        Self::with_backend(Arc::new(backend))
    }

    pub fn with_backend(backend: Arc<dyn Backend>) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = async_mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel();
        let cancel_all = CancellationToken::new();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("workchat-io")
            .enable_all()
            .build()?;

        let root = cancel_all.clone();
        let worker = thread::Builder::new()
            .name("workchat-engine".to_string())
            .spawn(move || {
                runtime.block_on(dispatch(backend, cmd_rx, event_tx, root));
                runtime.shutdown_timeout(Duration::from_millis(500));
            })?;

        Ok(Self {
            cmd_tx,
            event_rx,
            cancel_all,
            worker: Some(worker),
        })
    }

    pub fn send_chat(&self, exchange_id: ExchangeId, request: ChatRequest) {
        self.submit(Request::Chat {
            exchange_id,
            request,
        });
    }

    pub fn cancel_chat(&self, exchange_id: ExchangeId) {
        self.send(EngineCommand::Cancel(CancelKey::Exchange(exchange_id)));
    }

    pub fn list_files(&self) {
        self.submit(Request::ListFiles);
    }

    pub fn upload(&self, batch_id: BatchId, path: impl Into<PathBuf>) {
        self.submit(Request::Upload {
            batch_id,
            path: path.into(),
        });
    }

    pub fn cancel_uploads(&self, batch_id: BatchId) {
        self.send(EngineCommand::Cancel(CancelKey::Batch(batch_id)));
    }

    pub fn delete(&self, name: impl Into<String>) {
        self.submit(Request::Delete { name: name.into() });
    }

    pub fn run_indexer(&self) {
        self.submit(Request::RunIndexer);
    }

    pub fn status(&self) {
        self.submit(Request::Status);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Cancels all outstanding requests and stops the runtime.
    pub fn shutdown(&mut self) {
        self.cancel_all.cancel();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    fn submit(&self, request: Request) {
        self.send(EngineCommand::Submit(request));
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Cancellation tokens for requests that can be cancelled as a group.
#[derive(Clone)]
struct CancelRegistry {
    root: CancellationToken,
    entries: Arc<Mutex<HashMap<CancelKey, (CancellationToken, usize)>>>,
}

struct Registration {
    registry: CancelRegistry,
    key: Option<CancelKey>,
    token: CancellationToken,
}

impl CancelRegistry {
    fn new(root: CancellationToken) -> Self {
        Self {
            root,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn register(&self, key: Option<CancelKey>) -> Registration {
        let token = match key {
            Some(key) => {
                let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
                let entry = entries
                    .entry(key)
                    .or_insert_with(|| (self.root.child_token(), 0));
                entry.1 += 1;
                entry.0.clone()
            }
            None => self.root.child_token(),
        };
        Registration {
            registry: self.clone(),
            key,
            token,
        }
    }

    fn cancel(&self, key: CancelKey) {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(&key) {
            Some((token, live)) => {
                wc_info!("Cancelling {:?} ({} request(s) in flight)", key, live);
                token.cancel();
            }
            None => wc_debug!("Nothing in flight to cancel for {:?}", key),
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let Some(key) = self.key else {
            return;
        };
        let mut entries = self.registry.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.get_mut(&key) {
            entry.1 -= 1;
            if entry.1 == 0 {
                entries.remove(&key);
            }
        }
    }
}

async fn dispatch(
    backend: Arc<dyn Backend>,
    mut cmd_rx: async_mpsc::UnboundedReceiver<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
    shutdown: CancellationToken,
) {
    let registry = CancelRegistry::new(shutdown.clone());
    loop {
        let command = tokio::select! {
            _ = shutdown.cancelled() => break,
            command = cmd_rx.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        match command {
            EngineCommand::Cancel(key) => registry.cancel(key),
            EngineCommand::Submit(request) => {
                let registration = registry.register(request.cancel_key());
                let backend = backend.clone();
                let event_tx = event_tx.clone();
                tokio::spawn(async move {
                    let event = perform(backend.as_ref(), request, &registration.token).await;
                    let _ = event_tx.send(event);
                    drop(registration);
                });
            }
        }
    }
    wc_debug!("Engine dispatcher stopped");
}

async fn perform(backend: &dyn Backend, request: Request, token: &CancellationToken) -> EngineEvent {
    match request {
        Request::Chat {
            exchange_id,
            request,
        } => EngineEvent::ChatCompleted {
            exchange_id,
            result: cancellable(token, backend.send_chat(&request)).await,
        },
        Request::ListFiles => EngineEvent::ListingCompleted {
            result: cancellable(token, backend.list_files()).await,
        },
        Request::Upload { batch_id, path } => EngineEvent::UploadCompleted {
            batch_id,
            file_name: file_name_of(&path),
            result: cancellable(token, backend.upload_file(&path)).await,
        },
        Request::Delete { name } => {
            let result = cancellable(token, backend.delete_file(&name)).await;
            EngineEvent::DeleteCompleted { name, result }
        }
        Request::RunIndexer => EngineEvent::IndexerCompleted {
            result: cancellable(token, backend.run_indexer()).await,
        },
        Request::Status => EngineEvent::StatusCompleted {
            result: cancellable(token, backend.status()).await,
        },
    }
}

async fn cancellable<T>(
    token: &CancellationToken,
    request: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ApiError::cancelled()),
        result = request => result,
    }
}
