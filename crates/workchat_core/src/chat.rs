//! Conversational exchange controller.
//!
//! Cycles between Idle and Submitting. A submit appends the human turn
//! immediately; the exchange then settles with exactly one assistant turn,
//! either the backend's reply or [`FALLBACK_REPLY`](crate::FALLBACK_REPLY).
use crate::{Category, ChatReply, Effect, ExchangeId, Failure, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatPhase {
    #[default]
    Idle,
    Submitting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingExchange {
    pub exchange_id: ExchangeId,
    /// Index of the human turn in the log.
    pub log_index: usize,
    pub cancel_requested: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatState {
    log: Vec<Message>,
    pending: Option<PendingExchange>,
    draft: String,
    category: Option<Category>,
    next_exchange_id: ExchangeId,
}

impl ChatState {
    pub fn phase(&self) -> ChatPhase {
        if self.pending.is_some() {
            ChatPhase::Submitting
        } else {
            ChatPhase::Idle
        }
    }

    pub fn log(&self) -> &[Message] {
        &self.log
    }

    pub fn pending(&self) -> Option<&PendingExchange> {
        self.pending.as_ref()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub(crate) fn set_draft(&mut self, text: String) -> bool {
        if self.draft == text {
            return false;
        }
        self.draft = text;
        true
    }

    pub(crate) fn set_category(&mut self, category: Option<Category>) -> bool {
        if self.category == category {
            return false;
        }
        self.category = category;
        true
    }

    /// Appends the human turn and starts an exchange. `None` when rejected
    /// (empty text, or an exchange is already pending).
    pub(crate) fn submit(&mut self, text: String) -> Option<Effect> {
        if text.is_empty() || self.pending.is_some() {
            return None;
        }

        self.next_exchange_id += 1;
        let exchange_id = self.next_exchange_id;
        self.log.push(Message::human(text));
        self.draft.clear();
        self.pending = Some(PendingExchange {
            exchange_id,
            log_index: self.log.len() - 1,
            cancel_requested: false,
        });

        Some(Effect::SendChat {
            exchange_id,
            category: self.category,
            chats: self.log.clone(),
        })
    }

    /// Settles the pending exchange. Returns false for responses that belong
    /// to no pending exchange (late or duplicate deliveries).
    pub(crate) fn settle(
        &mut self,
        exchange_id: ExchangeId,
        result: Result<ChatReply, Failure>,
    ) -> bool {
        match &self.pending {
            Some(pending) if pending.exchange_id == exchange_id => {}
            _ => return false,
        }
        self.pending = None;

        let reply = match result {
            Ok(reply) => Message::assistant(reply.response, reply.sources),
            Err(_) => Message::fallback(),
        };
        self.log.push(reply);
        true
    }

    pub(crate) fn request_cancel(&mut self) -> Option<Effect> {
        let pending = self.pending.as_mut()?;
        if pending.cancel_requested {
            return None;
        }
        pending.cancel_requested = true;
        Some(Effect::CancelChat {
            exchange_id: pending.exchange_id,
        })
    }

    /// Clearing mid-exchange would orphan the pending reply, so it is ignored.
    pub(crate) fn clear(&mut self) -> bool {
        if self.pending.is_some() || self.log.is_empty() {
            return false;
        }
        self.log.clear();
        true
    }
}
