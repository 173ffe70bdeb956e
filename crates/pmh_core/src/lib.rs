//! Harvesting core: request parsing, date windows, query building, cursor
//! reconciliation and resumption-token values. Pure, no IO.
mod config;
mod cursor;
mod error;
pub mod fields;
mod format;
mod plan;
mod query;
mod record;
mod request;
mod token;
mod verb;
mod window;

pub use config::{
    AccessRestriction, DeletedRecordPolicy, IndexSettings, ProviderConfig, RepositoryIdentity,
    SetDescriptor,
};
pub use cursor::{CursorPosition, CursorReconciler, Fetch, Page};
pub use error::ProtocolError;
pub use format::{FormatCatalog, FormatDescriptor, MetadataFormat};
pub use plan::{plan, plan_list, ListPlan, Plan};
pub use query::{pad_range_value, Query, QueryBuilder, SetSelection, RANGE_VALUE_WIDTH, YEAR_PLACEHOLDER};
pub use record::{IndexRecord, VirtualItem};
pub use request::HarvestRequest;
pub use token::{is_valid_token_name, ResumptionToken, TokenNamer, TOKEN_NAME_PREFIX};
pub use verb::Verb;
pub use window::{
    check_window, format_datestamp, parse_bound, to_millis_window, Bound, Window,
    EPOCH_START_MILLIS, FAR_FUTURE_MILLIS,
};
