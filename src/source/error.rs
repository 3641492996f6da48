// src/source/error.rs
use thiserror::Error;

/// Failures talking to the remote source.
///
/// `Auth` aborts the run and invalidates the stored session; the other
/// variants abort the run without touching persisted state, so the same
/// items are retried next time.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("request for {what} failed")]
    Http {
        what: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request for {what} returned {status}")]
    Status {
        what: String,
        status: reqwest::StatusCode,
    },
}

impl SourceError {
    pub fn is_auth(&self) -> bool {
        matches!(self, SourceError::Auth(_))
    }

    pub(crate) fn http(what: impl Into<String>, source: reqwest::Error) -> Self {
        SourceError::Http {
            what: what.into(),
            source,
        }
    }
}
