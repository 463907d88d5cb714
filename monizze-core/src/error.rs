//! Error taxonomy for an export run.
//!
//! Every variant is fatal: a run either writes a complete CSV or writes nothing.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The platform rejected the bearer token. Never retried.
    #[error("authentication rejected (HTTP {status}); the token is invalid or expired")]
    Authentication { status: u16 },

    /// Rate limiting, server errors or network failures that outlived the retry budget.
    #[error("giving up after {attempts} attempts: {message}")]
    TransientFetch { attempts: u32, message: String },

    /// The response did not have the shape the history endpoint is expected to return.
    #[error("unexpected API response: {0}")]
    Protocol(String),

    /// A single entry could not be mapped to a transaction record.
    #[error(
        "cannot normalize `{field}`{}: {reason}",
        transaction.as_ref().map(|t| format!(" of transaction {t}")).unwrap_or_default()
    )]
    Normalization {
        field: &'static str,
        transaction: Option<String>,
        reason: String,
    },

    /// The same identifier came back twice with different contents.
    #[error("transaction {id} was returned twice with a different `{field}`")]
    Consistency { id: String, field: &'static str },

    /// The CSV could not be written to its destination.
    #[error("cannot export to {}: {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Process exit code for a CLI wrapping the pipeline.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Authentication { .. } => 10,
            Error::TransientFetch { .. } => 11,
            Error::Protocol(_) => 12,
            Error::Normalization { .. } => 13,
            Error::Consistency { .. } => 14,
            Error::Export { .. } => 15,
        }
    }

    pub fn normalization(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Normalization {
            field,
            transaction: None,
            reason: reason.into(),
        }
    }
}
