//! Input line parsing. Lines starting with `/` are commands, anything else is
//! a chat message. `//text` sends `/text` as a message.
use std::path::PathBuf;

use thiserror::Error;
use workchat_core::{Category, Msg, CATEGORIES};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Say(String),
    Clear,
    ListCategories,
    SelectCategory(Option<Category>),
    Cancel,
    Files,
    Refresh,
    Upload(Vec<PathBuf>),
    CancelUploads,
    Delete(String),
    Index,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command /{0}, try /help")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
  <text>              ask a question
  /clear              start a new conversation
  /categories         list sectors
  /category <n|none>  restrict answers to a sector
  /cancel             abandon the pending answer
  /files              show stored files
  /refresh            reload the file list
  /upload <path>...   upload files
  /cancel-uploads     abandon the running upload batch
  /delete <name>      delete a stored file
  /index              run the indexer
  /status             check the server
  /help               show this list
  /quit               exit";

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Say(line.to_string()));
    };
    if rest.starts_with('/') {
        return Ok(Command::Say(rest.to_string()));
    }

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "clear" => Command::Clear,
        "categories" => Command::ListCategories,
        "category" => Command::SelectCategory(parse_category(args)?),
        "cancel" => Command::Cancel,
        "files" => Command::Files,
        "refresh" => Command::Refresh,
        "upload" => {
            let paths: Vec<PathBuf> = args.split_whitespace().map(PathBuf::from).collect();
            if paths.is_empty() {
                return Err(CommandError::Usage("/upload <path>..."));
            }
            Command::Upload(paths)
        }
        "cancel-uploads" => Command::CancelUploads,
        "delete" => {
            if args.is_empty() {
                return Err(CommandError::Usage("/delete <name>"));
            }
            Command::Delete(args.to_string())
        }
        "index" => Command::Index,
        "status" => Command::Status,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(command)
}

fn parse_category(args: &str) -> Result<Option<Category>, CommandError> {
    const USAGE: &str = "/category <1-3|none>";
    if args.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let index: usize = args.parse().map_err(|_| CommandError::Usage(USAGE))?;
    index
        .checked_sub(1)
        .and_then(|i| CATEGORIES.get(i))
        .copied()
        .map(Some)
        .ok_or(CommandError::Usage(USAGE))
}

impl Command {
    /// Messages for the state machine. Commands handled by the front-end
    /// alone map to nothing.
    pub fn into_msgs(self) -> Vec<Msg> {
        match self {
            Command::Say(text) => vec![Msg::DraftChanged(text), Msg::SendClicked],
            Command::Clear => vec![Msg::ClearChatClicked],
            Command::SelectCategory(category) => vec![Msg::CategorySelected(category)],
            Command::Cancel => vec![Msg::CancelChatClicked],
            Command::Files => vec![Msg::FilesOpened],
            Command::Refresh => vec![Msg::RefreshFilesClicked],
            Command::Upload(paths) => vec![Msg::UploadFilesChosen(paths)],
            Command::CancelUploads => vec![Msg::CancelUploadsClicked],
            Command::Delete(name) => vec![Msg::DeleteFileClicked(name)],
            Command::Index => vec![Msg::RunIndexerClicked],
            Command::ListCategories | Command::Status | Command::Help | Command::Quit => {
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            parse("What is our day rate?\n"),
            Ok(Command::Say("What is our day rate?".to_string()))
        );
        assert_eq!(parse(""), Ok(Command::Say(String::new())));
        assert_eq!(parse("//etc/hosts"), Ok(Command::Say("/etc/hosts".to_string())));
    }

    #[test]
    fn commands_with_arguments() {
        assert_eq!(
            parse("/upload a.pdf  docs/b.docx"),
            Ok(Command::Upload(vec![
                PathBuf::from("a.pdf"),
                PathBuf::from("docs/b.docx")
            ]))
        );
        assert_eq!(
            parse("/delete Q3 report.pdf "),
            Ok(Command::Delete("Q3 report.pdf".to_string()))
        );
        assert_eq!(
            parse("/category 3"),
            Ok(Command::SelectCategory(Some(CATEGORIES[2])))
        );
        assert_eq!(parse("/category None"), Ok(Command::SelectCategory(None)));
    }

    #[test]
    fn bad_input_is_reported() {
        assert_eq!(parse("/upload"), Err(CommandError::Usage("/upload <path>...")));
        assert_eq!(parse("/delete"), Err(CommandError::Usage("/delete <name>")));
        assert!(matches!(parse("/category 0"), Err(CommandError::Usage(_))));
        assert!(matches!(parse("/category 4"), Err(CommandError::Usage(_))));
        assert_eq!(
            parse("/frobnicate now"),
            Err(CommandError::Unknown("frobnicate".to_string()))
        );
    }

    #[test]
    fn say_sets_draft_then_sends() {
        let msgs = Command::Say("hello".to_string()).into_msgs();
        assert!(matches!(
            msgs.as_slice(),
            [Msg::DraftChanged(text), Msg::SendClicked] if text == "hello"
        ));
        assert!(Command::Help.into_msgs().is_empty());
    }
}
