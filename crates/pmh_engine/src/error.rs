use std::fmt;
use std::io;

use pmh_core::ProtocolError;
use thiserror::Error;

/// Failure talking to the search index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct IndexError {
    pub kind: IndexFailureKind,
    pub message: String,
}

impl IndexError {
    pub fn new(kind: IndexFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Only timeout-like failures are worth another attempt.
    pub fn is_timeout(&self) -> bool {
        self.kind == IndexFailureKind::Timeout
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexFailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
}

impl fmt::Display for IndexFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexFailureKind::InvalidUrl => write!(f, "invalid index url"),
            IndexFailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            IndexFailureKind::Timeout => write!(f, "timeout"),
            IndexFailureKind::Network => write!(f, "network error"),
            IndexFailureKind::Decode => write!(f, "undecodable index response"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token directory missing or not writable: {0}")]
    TokenDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("token serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("token store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Transport-level failure: the request could not be served at all. Distinct
/// from protocol errors, which are answered with an error payload.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("index unavailable: {0}")]
    Index(#[from] IndexError),
    #[error("token store failure: {0}")]
    Store(#[from] StoreError),
}

/// Internal outcome used with `?` inside the dispatcher.
#[derive(Debug)]
pub(crate) enum Failure {
    Protocol(ProtocolError),
    Provider(ProviderError),
}

impl From<ProtocolError> for Failure {
    fn from(err: ProtocolError) -> Self {
        Failure::Protocol(err)
    }
}

impl From<IndexError> for Failure {
    fn from(err: IndexError) -> Self {
        Failure::Provider(err.into())
    }
}

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        Failure::Provider(err.into())
    }
}
