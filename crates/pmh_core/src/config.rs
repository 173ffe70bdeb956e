use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::format::{FormatCatalog, FormatDescriptor};

/// A named, client-selectable subset of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDescriptor {
    pub name: String,
    pub spec: String,
    /// Literal query replacing the base predicate when this set is requested.
    #[serde(default)]
    pub query: Option<String>,
}

/// Items matching `field:"value"` (and `condition`, if any) are hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRestriction {
    pub field: String,
    pub value: String,
    #[serde(default)]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletedRecordPolicy {
    No,
    Transient,
    Persistent,
}

impl DeletedRecordPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            DeletedRecordPolicy::No => "no",
            DeletedRecordPolicy::Transient => "transient",
            DeletedRecordPolicy::Persistent => "persistent",
        }
    }
}

/// Static repository description returned by Identify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    pub repository_name: String,
    pub base_url: String,
    #[serde(default)]
    pub admin_emails: Vec<String>,
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    #[serde(default = "default_deleted_record")]
    pub deleted_record: DeletedRecordPolicy,
    #[serde(default = "default_granularity")]
    pub granularity: String,
}

fn default_protocol_version() -> String {
    "2.0".to_string()
}

fn default_deleted_record() -> DeletedRecordPolicy {
    DeletedRecordPolicy::Persistent
}

fn default_granularity() -> String {
    "YYYY-MM-DDThh:mm:ssZ".to_string()
}

/// Configuration snapshot handed to the provider at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub identity: RepositoryIdentity,
    #[serde(default)]
    pub formats: FormatCatalog,
    #[serde(default)]
    pub sets: Vec<SetDescriptor>,
    /// Fields for which every distinct value is offered as a `FIELD:value` set.
    #[serde(default)]
    pub all_values_sets: Vec<String>,
    #[serde(default)]
    pub restrictions: Vec<AccessRestriction>,
    #[serde(default = "default_hits_per_page")]
    pub default_hits_per_page: usize,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    #[serde(default = "default_token_dir")]
    pub token_dir: PathBuf,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    pub index: IndexSettings,
}

/// Connection settings for the search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Base URL of the index core, e.g. `http://localhost:8983/solr/collection1`.
    pub url: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Total tries per index call; only timeouts are retried.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_hits_per_page() -> usize {
    100
}

fn default_token_ttl_secs() -> u64 {
    48 * 60 * 60
}

fn default_token_dir() -> PathBuf {
    PathBuf::from("resumption_tokens")
}

fn default_sweep_interval_secs() -> u64 {
    10 * 60
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    3
}

impl ProviderConfig {
    /// Minimal configuration pointing at `index_url`, mostly useful for tests.
    pub fn new(identity: RepositoryIdentity, index_url: impl Into<String>) -> Self {
        Self {
            identity,
            formats: FormatCatalog::default(),
            sets: Vec::new(),
            all_values_sets: Vec::new(),
            restrictions: Vec::new(),
            default_hits_per_page: default_hits_per_page(),
            token_ttl_secs: default_token_ttl_secs(),
            token_dir: default_token_dir(),
            sweep_interval_secs: default_sweep_interval_secs(),
            index: IndexSettings {
                url: index_url.into(),
                connect_timeout_ms: default_connect_timeout_ms(),
                request_timeout_ms: default_request_timeout_ms(),
                max_attempts: default_max_attempts(),
            },
        }
    }

    pub fn hits_per_page(&self, format: &FormatDescriptor) -> usize {
        format
            .hits_per_page
            .unwrap_or(self.default_hits_per_page)
            .max(1)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn find_set(&self, spec: &str) -> Option<&SetDescriptor> {
        self.sets.iter().find(|set| set.spec == spec)
    }

    /// Whether any kind of set is configured.
    pub fn has_set_hierarchy(&self) -> bool {
        !self.sets.is_empty() || !self.all_values_sets.is_empty()
    }
}

impl IndexSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
