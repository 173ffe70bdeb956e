use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of protocol verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    Identify,
    ListIdentifiers,
    ListMetadataFormats,
    ListRecords,
    ListSets,
    GetRecord,
}

impl Verb {
    pub const ALL: [Verb; 6] = [
        Verb::Identify,
        Verb::ListIdentifiers,
        Verb::ListMetadataFormats,
        Verb::ListRecords,
        Verb::ListSets,
        Verb::GetRecord,
    ];

    /// Case-sensitive lookup of the wire name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|verb| verb.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Identify => "Identify",
            Verb::ListIdentifiers => "ListIdentifiers",
            Verb::ListMetadataFormats => "ListMetadataFormats",
            Verb::ListRecords => "ListRecords",
            Verb::ListSets => "ListSets",
            Verb::GetRecord => "GetRecord",
        }
    }

    /// Verbs whose responses are paginated with resumption tokens.
    pub fn is_list(self) -> bool {
        matches!(self, Verb::ListIdentifiers | Verb::ListRecords)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
