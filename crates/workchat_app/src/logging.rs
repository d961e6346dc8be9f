//! Logger setup for the workchat binary.
//!
//! The conversation owns stdout, so the default is the `./workchat.log` file.
//! The terminal logger is for debugging the client against a local backend.

use std::fs::File;
use std::path::Path;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

const LOG_FILE: &str = "./workchat.log";

/// Where log records go. Selected by `log_destination` in the config file
/// or by `--log` on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum LogDestination {
    /// The log file next to where the client was started, truncated per run.
    #[default]
    File,
    /// Interleaved with the conversation on the terminal.
    Terminal,
    /// File and terminal.
    Both,
}

impl LogDestination {
    fn to_file(self) -> bool {
        matches!(self, LogDestination::File | LogDestination::Both)
    }

    fn to_terminal(self) -> bool {
        matches!(self, LogDestination::Terminal | LogDestination::Both)
    }
}

/// Installs the global logger. A second call keeps the first logger.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = records_config();
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    if destination.to_terminal() {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    if destination.to_file() {
        if let Some(file_logger) = open_log_file(Path::new(LOG_FILE), level, config) {
            loggers.push(file_logger);
        }
    }

    if !loggers.is_empty() {
        let _ = CombinedLogger::init(loggers);
    }
}

/// RFC 3339 timestamps; the HTTP stack's own records are left out.
fn records_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .add_filter_ignore_str("reqwest")
        .add_filter_ignore_str("hyper")
        .build()
}

fn open_log_file(path: &Path, level: LevelFilter, config: Config) -> Option<Box<WriteLogger<File>>> {
    match File::create(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: cannot write log file {}: {}", path.display(), err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destinations_select_sinks() {
        assert!(LogDestination::File.to_file() && !LogDestination::File.to_terminal());
        assert!(!LogDestination::Terminal.to_file() && LogDestination::Terminal.to_terminal());
        assert!(LogDestination::Both.to_file() && LogDestination::Both.to_terminal());
    }

    #[test]
    fn log_file_is_created_in_given_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.log");
        assert!(open_log_file(&path, LevelFilter::Info, records_config()).is_some());
        assert!(path.exists());

        let missing = dir.path().join("no-such-dir").join("client.log");
        assert!(open_log_file(&missing, LevelFilter::Info, records_config()).is_none());
    }
}
