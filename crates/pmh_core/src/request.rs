use serde::{Deserialize, Serialize};

use crate::format::MetadataFormat;
use crate::verb::Verb;

const KNOWN_ARGUMENTS: [&str; 7] = [
    "verb",
    "metadataPrefix",
    "identifier",
    "from",
    "until",
    "set",
    "resumptionToken",
];

/// Canonical form of one harvesting request.
///
/// Unknown verbs and metadata prefixes resolve to `None`; the dispatcher
/// decides which protocol error that deserves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestRequest {
    pub verb: Option<Verb>,
    pub metadata_prefix: Option<MetadataFormat>,
    /// The `metadataPrefix` value exactly as supplied.
    pub requested_prefix: Option<String>,
    pub identifier: Option<String>,
    pub from: Option<String>,
    pub until: Option<String>,
    pub set_spec: Option<String>,
    pub resumption_token: Option<String>,
    /// Parameter names outside the protocol's argument set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_arguments: Vec<String>,
}

impl HarvestRequest {
    /// Builds a request from flat key/value pairs. Only the first occurrence
    /// of each key counts; empty values are treated as absent.
    pub fn from_params<'a, I>(params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut request = HarvestRequest::default();
        let mut seen: Vec<&str> = Vec::new();
        for (key, value) in params {
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            if !KNOWN_ARGUMENTS.contains(&key) {
                request.unknown_arguments.push(key.to_string());
                continue;
            }
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key {
                "verb" => request.verb = Verb::from_name(value),
                "metadataPrefix" => {
                    request.metadata_prefix = MetadataFormat::from_prefix(value);
                    request.requested_prefix = Some(value.to_string());
                }
                "identifier" => request.identifier = Some(value.to_string()),
                "from" => request.from = Some(value.to_string()),
                "until" => request.until = Some(value.to_string()),
                "set" => request.set_spec = Some(value.to_string()),
                "resumptionToken" => request.resumption_token = Some(value.to_string()),
                _ => {}
            }
        }
        request
    }

    /// Parses a URL-encoded query string such as `verb=Identify`.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Self::from_params(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Whether any selection argument accompanies a resumption token.
    pub(crate) fn has_selection_arguments(&self) -> bool {
        self.requested_prefix.is_some()
            || self.identifier.is_some()
            || self.from.is_some()
            || self.until.is_some()
            || self.set_spec.is_some()
    }
}
