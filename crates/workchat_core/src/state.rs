use crate::chat::ChatState;
use crate::files::{FilesState, Notice};
use crate::view_model::AppViewModel;

/// Whole client state. The chat and files halves never read each other.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub(crate) chat: ChatState,
    pub(crate) files: FilesState,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chat(&self) -> &ChatState {
        &self.chat
    }

    pub fn files(&self) -> &FilesState {
        &self.files
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel::build(self, self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether anything changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// True when no exchange is pending, no upload batch is running and no
    /// delete awaits confirmation.
    pub fn is_settled(&self) -> bool {
        self.chat.pending().is_none()
            && self
                .files
                .batch_status()
                .is_none_or(|status| status.is_complete())
            && !self.files.has_pending_deletes()
    }

    /// Drains the user-facing notices accumulated since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.files.take_notices()
    }
}
