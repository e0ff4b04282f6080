//! Error taxonomy shared across the crate.
//!
//! Startup problems are fatal; everything else is soft and gets reported at
//! the turn boundary so the assistant can return to listening.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal startup problems. The process exits with user guidance before any
/// listening begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "no model API key found; pass it as the first argument or fill it into {}",
        .key_file
    )]
    MissingModelKey { key_file: String },

    #[error("could not read key file {path}: {source}")]
    UnreadableKeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Filesystem failures while touching the neocortex store.
///
/// A missing store is NOT an error: restore and enumerate degrade to empty
/// results instead. This type covers the cases that must reach the user,
/// such as permission problems or a full disk.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not read {}: {source}", .slot.display())]
    Read {
        slot: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write {}: {source}", .slot.display())]
    Write {
        slot: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("conversation slot {} holds malformed data: {source}", .slot.display())]
    Corrupt {
        slot: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Rejected persona mutations. No state changes when these are returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PersonaError {
    #[error("a preset cannot be empty")]
    InvalidPreset,

    #[error("a name cannot be empty")]
    InvalidName,
}

/// Rejected command arguments. The session is left untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("token budget {requested} is outside 1-3999")]
    BudgetOutOfRange { requested: i64 },

    #[error("no token count found in the request")]
    BudgetMissing,
}

/// Failures talking to the language-model backend. Soft: the turn ends
/// without appending to the transcript.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model reply was empty")]
    EmptyReply,
}
