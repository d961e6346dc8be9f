//! Incremental terminal rendering of the view model.
//!
//! The terminal is append-only, so the renderer remembers what it has already
//! printed and writes only what changed.
use std::io::{self, Write};

use workchat_core::{
    AppViewModel, ChatPhase, FilesView, MessageView, Notice, NoticeLevel, Role, UploadProgressView,
    CATEGORIES,
};

#[derive(Debug, Default)]
pub struct Renderer {
    shown_messages: usize,
    phase: ChatPhase,
    files_visible: bool,
    listing_revision: Option<u64>,
    upload: Option<UploadProgressView>,
}

impl Renderer {
    /// Makes the next render print the file listing, and keeps printing it
    /// whenever it changes.
    pub fn show_files(&mut self) {
        self.files_visible = true;
        self.listing_revision = None;
    }

    /// Whether there is output owed even though the state has not changed.
    pub fn has_pending_output(&self) -> bool {
        self.files_visible && self.listing_revision.is_none()
    }

    pub fn render(&mut self, view: &AppViewModel, out: &mut impl Write) -> io::Result<()> {
        let messages = &view.chat.messages;
        if messages.len() < self.shown_messages {
            writeln!(out, "-- new conversation --")?;
            self.shown_messages = 0;
        }
        for message in &messages[self.shown_messages..] {
            if message.role == Role::Assistant {
                write_message(message, out)?;
            }
        }
        self.shown_messages = messages.len();

        if view.chat.phase != self.phase {
            if view.chat.phase == ChatPhase::Submitting {
                writeln!(out, "... waiting for an answer (/cancel to abandon)")?;
            }
            self.phase = view.chat.phase;
        }

        if view.files.upload != self.upload {
            if let Some(upload) = view.files.upload {
                write_upload(&upload, out)?;
            }
            self.upload = view.files.upload;
        }

        // Revision 0 while the first fetch runs means "not loaded yet", not "empty".
        let loading = view.files.refreshing && view.files.listing_revision == 0;
        if self.files_visible
            && !loading
            && self.listing_revision != Some(view.files.listing_revision)
        {
            write_files(&view.files, out)?;
            self.listing_revision = Some(view.files.listing_revision);
        }
        out.flush()
    }
}

fn write_message(message: &MessageView, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "assistant> {}", message.content)?;
    if !message.sources.is_empty() {
        writeln!(out, "  sources:")?;
        for source in &message.sources {
            writeln!(out, "    {}  [{}]", source.label, source.scores)?;
        }
    }
    Ok(())
}

fn write_upload(upload: &UploadProgressView, out: &mut impl Write) -> io::Result<()> {
    if upload.failed > 0 {
        writeln!(
            out,
            "uploads: {}/{} done, {} failed",
            upload.done, upload.total, upload.failed
        )
    } else {
        writeln!(out, "uploads: {}/{} done", upload.done, upload.total)
    }
}

fn write_files(files: &FilesView, out: &mut impl Write) -> io::Result<()> {
    if files.files.is_empty() {
        return writeln!(out, "no stored files");
    }
    let width = files
        .files
        .iter()
        .map(|row| row.name.chars().count())
        .max()
        .unwrap_or(0);
    writeln!(out, "stored files ({}):", files.files.len())?;
    for row in &files.files {
        writeln!(
            out,
            "  {:<width$}  {:>9}  {}",
            row.name,
            row.size,
            row.created,
            width = width
        )?;
    }
    Ok(())
}

pub fn write_notices(notices: &[Notice], out: &mut impl Write) -> io::Result<()> {
    for notice in notices {
        match notice.level {
            NoticeLevel::Info => writeln!(out, "* {}", notice.text)?,
            NoticeLevel::Error => writeln!(out, "! {}", notice.text)?,
        }
    }
    Ok(())
}

pub fn write_categories(selected: Option<&str>, out: &mut impl Write) -> io::Result<()> {
    for (index, category) in CATEGORIES.iter().enumerate() {
        let marker = if selected == Some(category.label) { '*' } else { ' ' };
        writeln!(out, " {marker}{}. {}", index + 1, category.label)?;
    }
    Ok(())
}
