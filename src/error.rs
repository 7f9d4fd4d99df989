use std::{io, path::PathBuf};

use thiserror::Error;

use crate::channel::Channel;

/// Reasons a single render run is aborted.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("no valid GPS coordinates found")]
    NoValidData,
    #[error("unknown channel '{0}' (available: {names})", names = Channel::names().join(", "))]
    UnknownChannel(String),
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
