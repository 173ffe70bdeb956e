//! Harvesting engine: index access, token persistence and the protocol
//! dispatcher.
mod error;
mod index;
mod provider;
mod response;
mod store;

pub use error::{IndexError, IndexFailureKind, ProviderError, StoreError};
pub use index::{
    FieldValue, IndexQuery, IndexService, QueryResult, RetryingIndex, SolrIndex, SortOrder,
};
pub use provider::DataProvider;
pub use response::{
    IdentifyInfo, ListResponse, ProtocolErrorBody, Response, ResumptionInfo, SetEntry,
};
pub use store::{
    system_clock, Clock, FileTokenStore, MemoryTokenStore, Sweeper, TokenDraft, TokenStore,
};
