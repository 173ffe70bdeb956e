//! Resumption token persistence.
//!
//! Stores never hand out expired tokens and treat malformed names exactly
//! like unknown ones. Operations on different names do not coordinate;
//! operations on one name are serialized.
mod file;
mod memory;
mod sweeper;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;
pub use sweeper::Sweeper;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pmh_core::{CursorPosition, HarvestRequest, ResumptionToken};

use crate::StoreError;

/// Source of the current time, injected so expiry can be tested.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Everything a token holds except its name and expiry, which the store
/// assigns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDraft {
    pub virtual_hits: u64,
    pub raw_hits: u64,
    pub position: CursorPosition,
    pub original_request: HarvestRequest,
}

pub trait TokenStore: Send + Sync {
    /// Persists a new token expiring `ttl` after `now` and returns it.
    fn create(&self, draft: TokenDraft, now: DateTime<Utc>) -> Result<ResumptionToken, StoreError>;

    /// The stored token, or `None` if the name is malformed, unknown or
    /// the token expired before `now`.
    fn lookup(&self, name: &str, now: DateTime<Utc>) -> Result<Option<ResumptionToken>, StoreError>;

    /// Removes a token; returns whether it existed.
    fn delete(&self, name: &str) -> Result<bool, StoreError>;

    /// Removes every token expired at `now`; returns how many were removed.
    fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}
