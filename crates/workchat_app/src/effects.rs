use std::time::Duration;

use workchat_core::{
    Category, ChatReply, Effect, Failure, FailureKind, Message, Msg, Role, SourceRef, StoredFile,
};
use workchat_engine::{
    ApiError, ApiSettings, ChatRequest, EngineError, EngineEvent, EngineHandle, RemoteFile,
    WireCategory, WireMessage, WireRole, WireSource,
};
use workchat_logging::{wc_debug, wc_info, wc_warn};

/// What an engine event means to the front-end.
#[derive(Debug)]
pub enum Inbound {
    Update(Msg),
    /// Outcome of a status probe, which the state machine does not track.
    Status(Result<i64, String>),
}

/// Executes effects against the engine and translates its completions back
/// into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(settings: ApiSettings) -> Result<Self, EngineError> {
        wc_info!("Connecting to {}", settings.base_url);
        Ok(Self {
            engine: EngineHandle::new(settings)?,
        })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SendChat {
                    exchange_id,
                    category,
                    chats,
                } => {
                    wc_info!("SendChat exchange_id={} turns={}", exchange_id, chats.len());
                    self.engine.send_chat(exchange_id, chat_request(category, &chats));
                }
                Effect::CancelChat { exchange_id } => self.engine.cancel_chat(exchange_id),
                Effect::FetchListing => self.engine.list_files(),
                Effect::UploadFile { batch_id, path } => {
                    wc_debug!("UploadFile batch_id={} path={:?}", batch_id, path);
                    self.engine.upload(batch_id, path);
                }
                Effect::CancelUploads { batch_id } => self.engine.cancel_uploads(batch_id),
                Effect::DeleteFile { name } => self.engine.delete(name),
                Effect::RunIndexer => self.engine.run_indexer(),
            }
        }
    }

    pub fn probe_status(&self) {
        self.engine.status();
    }

    /// Waits up to `timeout` for the first completion, then drains the rest.
    pub fn poll(&self, timeout: Duration) -> Vec<Inbound> {
        let mut inbound = Vec::new();
        let mut next = self.engine.recv_timeout(timeout);
        while let Some(event) = next {
            inbound.push(translate(event));
            next = self.engine.try_recv();
        }
        inbound
    }

    pub fn shutdown(&mut self) {
        self.engine.shutdown();
    }
}

pub fn translate(event: EngineEvent) -> Inbound {
    let msg = match event {
        EngineEvent::ChatCompleted {
            exchange_id,
            result,
        } => Msg::ChatResponded {
            exchange_id,
            result: result
                .map(|body| ChatReply {
                    response: body.response,
                    sources: body.sources.map(from_wire_sources),
                })
                .map_err(|err| failure("Chat", &err)),
        },
        EngineEvent::ListingCompleted { result } => Msg::ListingFetched(
            result
                .map(|files| files.into_iter().map(stored_file).collect())
                .map_err(|err| failure("File listing", &err)),
        ),
        EngineEvent::UploadCompleted {
            batch_id,
            file_name,
            result,
        } => {
            let result = result.map_err(|err| failure(&format!("Upload of {file_name}"), &err));
            Msg::UploadFinished {
                batch_id,
                file_name,
                result,
            }
        }
        EngineEvent::DeleteCompleted { name, result } => {
            let result = result.map_err(|err| failure(&format!("Delete of {name}"), &err));
            Msg::DeleteFinished { name, result }
        }
        EngineEvent::IndexerCompleted { result } => {
            Msg::IndexerFinished(result.map_err(|err| failure("Indexer run", &err)))
        }
        EngineEvent::StatusCompleted { result } => {
            return Inbound::Status(result.map(|status| status.status).map_err(|err| {
                wc_warn!("Status probe failed: {}", err);
                err.to_string()
            }));
        }
    };
    Inbound::Update(msg)
}

fn failure(what: &str, err: &ApiError) -> Failure {
    wc_warn!("{} failed: {}", what, err);
    let kind = match err.kind {
        workchat_engine::FailureKind::Timeout => FailureKind::Timeout,
        workchat_engine::FailureKind::Application => FailureKind::Application,
        workchat_engine::FailureKind::Cancelled => FailureKind::Cancelled,
        workchat_engine::FailureKind::InvalidRequest
        | workchat_engine::FailureKind::HttpStatus(_)
        | workchat_engine::FailureKind::Network
        | workchat_engine::FailureKind::MalformedBody => FailureKind::Transport,
    };
    Failure::new(kind, err.message.clone())
}

fn chat_request(category: Option<Category>, chats: &[Message]) -> ChatRequest {
    ChatRequest {
        category: category.map(|category| WireCategory {
            id: category.id.to_string(),
            label: category.label.to_string(),
        }),
        chats: chats.iter().map(wire_message).collect(),
    }
}

fn wire_message(message: &Message) -> WireMessage {
    WireMessage {
        role: match message.role {
            Role::Human => WireRole::Human,
            Role::Assistant => WireRole::Assistant,
        },
        content: message.content.clone(),
        sources: message.sources.as_ref().map(|sources| {
            sources
                .iter()
                .map(|source| {
                    WireSource::new(source.kind.clone(), source.label.clone(), source.scores.clone())
                })
                .collect()
        }),
    }
}

fn from_wire_sources(sources: Vec<WireSource>) -> Vec<SourceRef> {
    sources
        .into_iter()
        .map(|WireSource(key, scores)| SourceRef {
            kind: key.0,
            label: key.1,
            scores,
        })
        .collect()
}

fn stored_file(file: RemoteFile) -> StoredFile {
    StoredFile {
        name: file.name,
        size: file.size,
        last_modified: file.last_modified,
        creation_time: file.creation_time,
        content_hash: file.content_md5,
    }
}

#[cfg(test)]
mod tests {
    use workchat_core::CATEGORIES;
    use workchat_engine::{ApiStatus, ChatBody};

    use super::*;

    #[test]
    fn history_is_sent_with_wire_roles_and_sources() {
        let chats = vec![
            Message::human("q1"),
            Message::assistant(
                "a1",
                Some(vec![SourceRef {
                    kind: "document".to_string(),
                    label: "x.pdf".to_string(),
                    scores: vec![0.5],
                }]),
            ),
        ];
        let request = chat_request(Some(CATEGORIES[0]), &chats);

        let category = request.category.unwrap();
        assert_eq!(category.id, CATEGORIES[0].id.to_string());
        assert_eq!(category.label, CATEGORIES[0].label);
        assert_eq!(request.chats[0].role, WireRole::Human);
        assert_eq!(request.chats[0].sources, None);
        assert_eq!(request.chats[1].role, WireRole::Assistant);
        assert_eq!(
            request.chats[1].sources,
            Some(vec![WireSource::new("document", "x.pdf", vec![0.5])])
        );
    }

    #[test]
    fn chat_reply_keeps_source_order() {
        let inbound = translate(EngineEvent::ChatCompleted {
            exchange_id: 2,
            result: Ok(ChatBody {
                response: "ok".to_string(),
                sources: Some(vec![
                    WireSource::new("document", "b.pdf", vec![0.2]),
                    WireSource::new("document", "a.pdf", vec![0.1]),
                ]),
            }),
        });
        let Inbound::Update(Msg::ChatResponded {
            exchange_id,
            result: Ok(reply),
        }) = inbound
        else {
            panic!("unexpected translation");
        };
        assert_eq!(exchange_id, 2);
        let labels: Vec<_> = reply
            .sources
            .unwrap()
            .into_iter()
            .map(|source| source.label)
            .collect();
        assert_eq!(labels, vec!["b.pdf", "a.pdf"]);
    }

    #[test]
    fn api_failures_collapse_to_core_kinds() {
        let cases = [
            (workchat_engine::FailureKind::HttpStatus(502), FailureKind::Transport),
            (workchat_engine::FailureKind::Network, FailureKind::Transport),
            (workchat_engine::FailureKind::MalformedBody, FailureKind::Transport),
            (workchat_engine::FailureKind::InvalidRequest, FailureKind::Transport),
            (workchat_engine::FailureKind::Timeout, FailureKind::Timeout),
            (workchat_engine::FailureKind::Application, FailureKind::Application),
            (workchat_engine::FailureKind::Cancelled, FailureKind::Cancelled),
        ];
        for (api_kind, expected) in cases {
            let err = ApiError {
                kind: api_kind,
                message: "boom".to_string(),
            };
            assert_eq!(failure("test", &err).kind, expected);
        }
    }

    #[test]
    fn status_is_reported_outside_the_state_machine() {
        let inbound = translate(EngineEvent::StatusCompleted {
            result: Ok(ApiStatus { status: 1 }),
        });
        assert!(matches!(inbound, Inbound::Status(Ok(1))));
    }
}
