//! Error taxonomy for remote account management.
//!
//! Validation and parse failures surface before any remote command runs.
//! Execution failures carry the combined stdout+stderr of the failed
//! command. Verification failures mean a command exited zero but the
//! re-read database did not reflect the change.

use thiserror::Error;

use crate::passwd::User;

#[derive(Debug, Error)]
pub enum Error {
    /// A required field was missing or malformed before any remote action.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A passwd line did not split into exactly 7 fields. The whole parse
    /// aborts; no partial record list is ever returned.
    #[error("malformed passwd line {line}: expected 7 fields, found {fields}: {content:?}")]
    Parse {
        line: usize,
        fields: usize,
        content: String,
    },

    /// The remote command could not be started at all.
    #[error("cannot run {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The remote command did not finish within the runner's deadline.
    #[error("{command:?} timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    /// The remote command exited nonzero. `output` is the combined
    /// stdout+stderr, kept for diagnostics.
    #[error("{command:?} exited with {status}: {output}")]
    Execution {
        command: String,
        status: i32,
        output: String,
    },

    /// useradd exited zero but the account is absent from the re-read
    /// database.
    #[error("user {name:?} not present after add")]
    AddUnverified { name: String },

    /// userdel exited zero but the account is still resolvable. Carries
    /// the pre-delete record so the caller keeps both the diagnostic and
    /// the stale state.
    #[error("user {:?} still present after delete", .stale.name)]
    DeleteUnverified { stale: User },

    /// Delete target did not resolve. Deleting a nonexistent account is
    /// an error, not a silent no-op.
    #[error("user matching {query:?} not found")]
    NotFound { query: String },
}

pub type Result<T> = std::result::Result<T, Error>;
