//! Batch upload synchronizer and the file listing cache it keeps fresh.
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::{BatchId, Effect, Failure, StoredFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadBatchStatus {
    pub total: usize,
    pub done: usize,
}

impl UploadBatchStatus {
    pub fn is_complete(&self) -> bool {
        self.done == self.total
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBatch {
    pub batch_id: BatchId,
    pub status: UploadBatchStatus,
    /// Names of files whose upload failed, in completion order.
    pub failed: Vec<String>,
    pub cancel_requested: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A one-shot status line for the user, drained by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilesState {
    cache: BTreeMap<String, StoredFile>,
    cache_stale: bool,
    listing_in_flight: bool,
    /// Set when staleness is signalled while a listing request is running;
    /// that response predates the change, so one more fetch is owed.
    stale_during_fetch: bool,
    batch: Option<UploadBatch>,
    next_batch_id: BatchId,
    /// Deletes awaiting confirmation, with the cache entry they removed (if
    /// the name was cached) so a failure can put it back.
    tentative_deletes: BTreeMap<String, Option<StoredFile>>,
    indexer_running: bool,
    listing_revision: u64,
    notices: Vec<Notice>,
}

impl Default for FilesState {
    fn default() -> Self {
        Self {
            cache: BTreeMap::new(),
            // Nothing has been fetched yet, so the first `start_fetch` always runs.
            cache_stale: true,
            listing_in_flight: false,
            stale_during_fetch: false,
            batch: None,
            next_batch_id: 0,
            tentative_deletes: BTreeMap::new(),
            indexer_running: false,
            listing_revision: 0,
            notices: Vec::new(),
        }
    }
}

impl FilesState {
    pub fn files(&self) -> impl Iterator<Item = &StoredFile> {
        self.cache.values()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    pub fn file_count(&self) -> usize {
        self.cache.len()
    }

    pub fn is_stale(&self) -> bool {
        self.cache_stale
    }

    pub fn is_listing_in_flight(&self) -> bool {
        self.listing_in_flight
    }

    pub fn batch(&self) -> Option<&UploadBatch> {
        self.batch.as_ref()
    }

    pub fn batch_status(&self) -> Option<UploadBatchStatus> {
        self.batch.as_ref().map(|batch| batch.status)
    }

    pub fn is_delete_pending(&self, name: &str) -> bool {
        self.tentative_deletes.contains_key(name)
    }

    pub fn is_indexer_running(&self) -> bool {
        self.indexer_running
    }

    /// Bumped every time the cache contents change.
    pub fn listing_revision(&self) -> u64 {
        self.listing_revision
    }

    pub(crate) fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Issues a listing request if the cache is stale and none is running.
    pub(crate) fn start_fetch(&mut self) -> Option<Effect> {
        if !self.cache_stale || self.listing_in_flight {
            return None;
        }
        self.listing_in_flight = true;
        Some(Effect::FetchListing)
    }

    pub(crate) fn mark_stale(&mut self) {
        if self.listing_in_flight {
            self.stale_during_fetch = true;
        }
        self.cache_stale = true;
    }

    /// Applies a listing response. Success replaces the cache wholesale;
    /// failure keeps it. Staleness is cleared either way.
    pub(crate) fn apply_listing(
        &mut self,
        result: Result<Vec<StoredFile>, Failure>,
    ) -> Option<Effect> {
        if !self.listing_in_flight {
            return None;
        }
        self.listing_in_flight = false;
        self.cache_stale = std::mem::take(&mut self.stale_during_fetch);

        match result {
            Ok(files) => {
                let tentative = &self.tentative_deletes;
                let cache: BTreeMap<String, StoredFile> = files
                    .into_iter()
                    .filter(|file| !tentative.contains_key(&file.name))
                    .map(|file| (file.name.clone(), file))
                    .collect();
                self.cache = cache;
                self.listing_revision += 1;
            }
            Err(failure) => {
                self.notices
                    .push(Notice::error(format!("Could not refresh file list ({failure})")));
            }
        }

        self.start_fetch()
    }

    /// Starts a batch with one upload per path. Empty selections are ignored.
    /// A new batch supersedes any unfinished one.
    pub(crate) fn begin_batch(&mut self, paths: Vec<PathBuf>) -> Vec<Effect> {
        if paths.is_empty() {
            return Vec::new();
        }

        self.next_batch_id += 1;
        let batch_id = self.next_batch_id;
        self.batch = Some(UploadBatch {
            batch_id,
            status: UploadBatchStatus {
                total: paths.len(),
                done: 0,
            },
            failed: Vec::new(),
            cancel_requested: false,
        });

        paths
            .into_iter()
            .map(|path| Effect::UploadFile { batch_id, path })
            .collect()
    }

    /// Counts one finished upload. Completing the batch marks the cache stale.
    /// Returns `(counted, effect)`.
    pub(crate) fn finish_upload(
        &mut self,
        batch_id: BatchId,
        file_name: String,
        result: Result<(), Failure>,
    ) -> (bool, Option<Effect>) {
        let Some(batch) = self.batch.as_mut() else {
            return (false, None);
        };
        if batch.batch_id != batch_id || batch.status.is_complete() {
            return (false, None);
        }

        batch.status.done += 1;
        if result.is_err() {
            batch.failed.push(file_name);
        }
        if !batch.status.is_complete() {
            return (true, None);
        }

        let summary = if batch.failed.is_empty() {
            Notice::info(format!("Uploaded {} file(s)", batch.status.total))
        } else {
            Notice::error(format!(
                "{} of {} upload(s) failed: {}",
                batch.failed.len(),
                batch.status.total,
                batch.failed.join(", ")
            ))
        };
        self.notices.push(summary);
        self.mark_stale();
        (true, self.start_fetch())
    }

    pub(crate) fn request_cancel_uploads(&mut self) -> Option<Effect> {
        let batch = self.batch.as_mut()?;
        if batch.status.is_complete() || batch.cancel_requested {
            return None;
        }
        batch.cancel_requested = true;
        Some(Effect::CancelUploads {
            batch_id: batch.batch_id,
        })
    }

    /// Removes `name` from the cache right away and asks the backend to delete
    /// it. Names the cache does not know are still sent; a second delete for
    /// a name already in progress is ignored.
    pub(crate) fn delete(&mut self, name: String) -> Option<Effect> {
        if self.tentative_deletes.contains_key(&name) {
            return None;
        }
        let file = self.cache.remove(&name);
        if file.is_some() {
            self.listing_revision += 1;
        }
        self.tentative_deletes.insert(name.clone(), file);
        Some(Effect::DeleteFile { name })
    }

    pub fn has_pending_deletes(&self) -> bool {
        !self.tentative_deletes.is_empty()
    }

    /// Confirms or rolls back a tentative delete.
    pub(crate) fn finish_delete(&mut self, name: &str, result: Result<(), Failure>) -> bool {
        let Some(removed) = self.tentative_deletes.remove(name) else {
            return false;
        };
        match (result, removed) {
            (Ok(()), Some(_)) => {}
            // Nothing was shown for it, so the outcome is the only feedback.
            (Ok(()), None) => self.notices.push(Notice::info(format!("Deleted {name}"))),
            (Err(failure), removed) => {
                self.notices
                    .push(Notice::error(format!("Could not delete {name} ({failure})")));
                if let Some(file) = removed {
                    if !self.cache.contains_key(name) {
                        self.cache.insert(name.to_string(), file);
                        self.listing_revision += 1;
                    }
                }
            }
        }
        true
    }

    pub(crate) fn run_indexer(&mut self) -> Effect {
        self.indexer_running = true;
        Effect::RunIndexer
    }

    pub(crate) fn finish_indexer(&mut self, result: Result<(), Failure>) {
        self.indexer_running = false;
        let notice = match result {
            Ok(()) => Notice::info("Indexer started"),
            Err(failure) => Notice::error(format!("Indexer request failed ({failure})")),
        };
        self.notices.push(notice);
    }
}
