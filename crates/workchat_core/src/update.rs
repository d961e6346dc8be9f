use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let mut changed = false;
    let effects = match msg {
        Msg::DraftChanged(text) => {
            changed = state.chat.set_draft(text);
            Vec::new()
        }
        Msg::SendClicked => {
            let text = state.chat.draft().to_string();
            match state.chat.submit(text) {
                Some(effect) => {
                    changed = true;
                    vec![effect]
                }
                None => Vec::new(),
            }
        }
        Msg::CategorySelected(category) => {
            changed = state.chat.set_category(category);
            Vec::new()
        }
        Msg::ClearChatClicked => {
            changed = state.chat.clear();
            Vec::new()
        }
        Msg::CancelChatClicked => state.chat.request_cancel().into_iter().collect(),
        Msg::ChatResponded {
            exchange_id,
            result,
        } => {
            changed = state.chat.settle(exchange_id, result);
            Vec::new()
        }
        Msg::FilesOpened => {
            let effect = state.files.start_fetch();
            changed = effect.is_some();
            effect.into_iter().collect()
        }
        Msg::RefreshFilesClicked => {
            state.files.mark_stale();
            changed = true;
            state.files.start_fetch().into_iter().collect()
        }
        Msg::ListingFetched(result) => {
            let was_in_flight = state.files.is_listing_in_flight();
            let effect = state.files.apply_listing(result);
            changed = was_in_flight;
            effect.into_iter().collect()
        }
        Msg::UploadFilesChosen(paths) => {
            let effects = state.files.begin_batch(paths);
            changed = !effects.is_empty();
            effects
        }
        Msg::CancelUploadsClicked => state.files.request_cancel_uploads().into_iter().collect(),
        Msg::UploadFinished {
            batch_id,
            file_name,
            result,
        } => {
            let (counted, effect) = state.files.finish_upload(batch_id, file_name, result);
            changed = counted;
            effect.into_iter().collect()
        }
        Msg::DeleteFileClicked(name) => {
            let effect = state.files.delete(name);
            changed = effect.is_some();
            effect.into_iter().collect()
        }
        Msg::DeleteFinished { name, result } => {
            changed = state.files.finish_delete(&name, result);
            Vec::new()
        }
        Msg::RunIndexerClicked => {
            changed = true;
            vec![state.files.run_indexer()]
        }
        Msg::IndexerFinished(result) => {
            state.files.finish_indexer(result);
            changed = true;
            Vec::new()
        }
    };

    if changed {
        state.mark_dirty();
    }
    (state, effects)
}
