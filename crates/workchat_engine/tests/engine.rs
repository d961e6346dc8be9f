use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use workchat_engine::{
    ApiError, ApiStatus, Backend, ChatBody, ChatRequest, EngineEvent, EngineHandle, FailureKind,
    RemoteFile,
};

const WAIT: Duration = Duration::from_secs(5);

/// Backend whose chat and upload calls take `delay`; uploads of files named
/// `bad*` fail.
struct ScriptedBackend {
    delay: Duration,
    uploads: AtomicUsize,
}

impl ScriptedBackend {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            uploads: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl Backend for ScriptedBackend {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatBody, ApiError> {
        tokio::time::sleep(self.delay).await;
        Ok(ChatBody {
            response: format!("{} turn(s) seen", request.chats.len()),
            sources: None,
        })
    }

    async fn list_files(&self) -> Result<Vec<RemoteFile>, ApiError> {
        Ok(vec![RemoteFile {
            name: "a.txt".to_string(),
            size: 3,
            last_modified: None,
            creation_time: None,
            content_md5: None,
        }])
    }

    async fn upload_file(&self, path: &Path) -> Result<(), ApiError> {
        tokio::time::sleep(self.delay).await;
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.starts_with("bad") {
            Err(ApiError {
                kind: FailureKind::Application,
                message: "rejected".to_string(),
            })
        } else {
            Ok(())
        }
    }

    async fn delete_file(&self, _name: &str) -> Result<(), ApiError> {
        Err(ApiError {
            kind: FailureKind::HttpStatus(500),
            message: "500 Internal Server Error".to_string(),
        })
    }

    async fn run_indexer(&self) -> Result<(), ApiError> {
        Ok(())
    }

    async fn status(&self) -> Result<ApiStatus, ApiError> {
        Ok(ApiStatus { status: 1 })
    }
}

fn next_event(engine: &EngineHandle) -> EngineEvent {
    engine.recv_timeout(WAIT).expect("engine event")
}

fn empty_request() -> ChatRequest {
    ChatRequest {
        category: None,
        chats: Vec::new(),
    }
}

#[test]
fn chat_completion_carries_exchange_id() {
    let engine = EngineHandle::with_backend(ScriptedBackend::new(Duration::ZERO)).unwrap();
    engine.send_chat(7, empty_request());

    match next_event(&engine) {
        EngineEvent::ChatCompleted {
            exchange_id,
            result,
        } => {
            assert_eq!(exchange_id, 7);
            assert_eq!(result.unwrap().response, "0 turn(s) seen");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn cancelled_chat_reports_cancelled_failure() {
    let engine = EngineHandle::with_backend(ScriptedBackend::new(Duration::from_secs(30))).unwrap();
    engine.send_chat(1, empty_request());
    std::thread::sleep(Duration::from_millis(50));
    engine.cancel_chat(1);

    match next_event(&engine) {
        EngineEvent::ChatCompleted {
            exchange_id,
            result,
        } => {
            assert_eq!(exchange_id, 1);
            assert_eq!(result.unwrap_err().kind, FailureKind::Cancelled);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn every_upload_in_a_batch_reports_once() {
    let backend = ScriptedBackend::new(Duration::from_millis(10));
    let engine = EngineHandle::with_backend(backend.clone()).unwrap();
    engine.upload(3, "/tmp/one.pdf");
    engine.upload(3, "/tmp/bad.pdf");
    engine.upload(3, "/tmp/three.pdf");

    let mut outcomes = Vec::new();
    for _ in 0..3 {
        match next_event(&engine) {
            EngineEvent::UploadCompleted {
                batch_id,
                file_name,
                result,
            } => {
                assert_eq!(batch_id, 3);
                outcomes.push((file_name, result.is_ok()));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    outcomes.sort();
    assert_eq!(
        outcomes,
        vec![
            ("bad.pdf".to_string(), false),
            ("one.pdf".to_string(), true),
            ("three.pdf".to_string(), true),
        ]
    );
    assert_eq!(backend.uploads.load(Ordering::SeqCst), 3);
    assert!(engine.recv_timeout(Duration::from_millis(100)).is_none());
}

#[test]
fn cancelling_a_batch_settles_all_its_uploads() {
    let engine = EngineHandle::with_backend(ScriptedBackend::new(Duration::from_secs(30))).unwrap();
    engine.upload(4, "/tmp/a.pdf");
    engine.upload(4, "/tmp/b.pdf");
    std::thread::sleep(Duration::from_millis(50));
    engine.cancel_uploads(4);

    for _ in 0..2 {
        match next_event(&engine) {
            EngineEvent::UploadCompleted {
                batch_id, result, ..
            } => {
                assert_eq!(batch_id, 4);
                assert_eq!(result.unwrap_err().kind, FailureKind::Cancelled);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[test]
fn cancelling_one_batch_leaves_another_running() {
    let engine = EngineHandle::with_backend(ScriptedBackend::new(Duration::from_millis(200))).unwrap();
    engine.upload(1, "/tmp/old.pdf");
    engine.upload(2, "/tmp/new.pdf");
    std::thread::sleep(Duration::from_millis(50));
    engine.cancel_uploads(1);

    let mut results = Vec::new();
    for _ in 0..2 {
        if let EngineEvent::UploadCompleted {
            batch_id, result, ..
        } = next_event(&engine)
        {
            results.push((batch_id, result.map_err(|err| err.kind)));
        }
    }
    results.sort_by_key(|(batch_id, _)| *batch_id);
    assert_eq!(
        results,
        vec![(1, Err(FailureKind::Cancelled)), (2, Ok(()))]
    );
}

#[test]
fn listing_delete_indexer_and_status_events() {
    let engine = EngineHandle::with_backend(ScriptedBackend::new(Duration::ZERO)).unwrap();

    engine.list_files();
    match next_event(&engine) {
        EngineEvent::ListingCompleted { result } => {
            assert_eq!(result.unwrap()[0].name, "a.txt");
        }
        other => panic!("unexpected event {other:?}"),
    }

    engine.delete("a.txt");
    match next_event(&engine) {
        EngineEvent::DeleteCompleted { name, result } => {
            assert_eq!(name, "a.txt");
            assert_eq!(result.unwrap_err().kind, FailureKind::HttpStatus(500));
        }
        other => panic!("unexpected event {other:?}"),
    }

    engine.run_indexer();
    assert_eq!(
        next_event(&engine),
        EngineEvent::IndexerCompleted { result: Ok(()) }
    );

    engine.status();
    assert_eq!(
        next_event(&engine),
        EngineEvent::StatusCompleted {
            result: Ok(ApiStatus { status: 1 })
        }
    );
}

#[test]
fn shutdown_stops_outstanding_requests() {
    let mut engine =
        EngineHandle::with_backend(ScriptedBackend::new(Duration::from_secs(30))).unwrap();
    engine.send_chat(1, empty_request());
    std::thread::sleep(Duration::from_millis(20));
    engine.shutdown();
    engine.shutdown();
}
