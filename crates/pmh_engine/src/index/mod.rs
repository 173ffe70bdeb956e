//! The search index collaborator.
mod retry;
mod solr;

pub use retry::RetryingIndex;
pub use solr::SolrIndex;

use pmh_core::{fields, IndexRecord, Query};

use crate::IndexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// One window of a predicate's result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexQuery {
    pub predicate: Query,
    pub offset: u64,
    pub limit: usize,
    pub sort: Vec<(String, SortOrder)>,
}

impl IndexQuery {
    /// Harvest order: oldest update first, identifier as tie-breaker, so raw
    /// offsets stay stable between pages.
    pub fn harvest(predicate: Query, offset: u64, limit: usize) -> Self {
        Self {
            predicate,
            offset,
            limit,
            sort: vec![
                (fields::DATE_UPDATED.to_string(), SortOrder::Asc),
                (fields::PI.to_string(), SortOrder::Asc),
            ],
        }
    }

    /// Count-only query.
    pub fn count(predicate: Query) -> Self {
        Self::harvest(predicate, 0, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryResult {
    pub total: u64,
    pub records: Vec<IndexRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub value: String,
    pub count: u64,
}

#[async_trait::async_trait]
pub trait IndexService: Send + Sync {
    async fn query(&self, query: &IndexQuery) -> Result<QueryResult, IndexError>;

    /// Sum over matching records of the number of distinct values each
    /// record holds in `field`.
    async fn distinct_value_count(&self, field: &str, predicate: &Query)
        -> Result<u64, IndexError>;

    /// Every value of `field` among matching records, with record counts.
    async fn field_values(
        &self,
        field: &str,
        predicate: &Query,
    ) -> Result<Vec<FieldValue>, IndexError>;
}
