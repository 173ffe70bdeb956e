use chrono::{DateTime, Utc};
use pmh_core::{FormatDescriptor, MetadataFormat, ProtocolError, RepositoryIdentity, Verb, VirtualItem};
use serde::Serialize;

/// Outcome of one harvesting request, handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    Identify(IdentifyInfo),
    MetadataFormats { formats: Vec<FormatDescriptor> },
    Sets { sets: Vec<SetEntry> },
    /// GetRecord: one item, or one per variant for expanding formats.
    Record {
        format: MetadataFormat,
        items: Vec<VirtualItem>,
    },
    List(ListResponse),
    Error(ProtocolErrorBody),
}

impl Response {
    pub fn error(err: ProtocolError) -> Self {
        Response::Error(ProtocolErrorBody {
            code: err,
            message: err.message().to_string(),
        })
    }

    /// The protocol error carried by this response, if any.
    pub fn protocol_error(&self) -> Option<ProtocolError> {
        match self {
            Response::Error(body) => Some(body.code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolErrorBody {
    pub code: ProtocolError,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifyInfo {
    pub identity: RepositoryIdentity,
    pub earliest_datestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetEntry {
    pub spec: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListResponse {
    pub verb: Verb,
    pub format: MetadataFormat,
    pub items: Vec<VirtualItem>,
    /// Absent when the whole list fit in a single page.
    pub resumption: Option<ResumptionInfo>,
}

/// The `resumptionToken` element of a list page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumptionInfo {
    /// Successor token; `None` on the final page of a resumed harvest.
    pub token: Option<String>,
    pub complete_list_size: u64,
    /// Virtual items delivered before this page.
    pub cursor: u64,
    pub expiration_date: Option<DateTime<Utc>>,
}
