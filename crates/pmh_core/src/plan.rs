use crate::config::ProviderConfig;
use crate::error::ProtocolError;
use crate::format::MetadataFormat;
use crate::request::HarvestRequest;
use crate::verb::Verb;
use crate::window::{check_window, to_millis_window, Window};

/// What the dispatcher must do to answer a validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Identify,
    ListMetadataFormats {
        identifier: Option<String>,
    },
    ListSets,
    GetRecord {
        identifier: String,
        format: MetadataFormat,
    },
    /// First page of a ListIdentifiers/ListRecords harvest.
    List(ListPlan),
    /// A later page; the token's stored request governs the selection.
    Resume {
        verb: Verb,
        token_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPlan {
    pub verb: Verb,
    pub format: MetadataFormat,
    pub set_spec: Option<String>,
    pub window: Window,
    /// Request as received; embedded in any resumption token.
    pub request: HarvestRequest,
}

/// Validates arguments for the requested verb.
pub fn plan(request: &HarvestRequest, config: &ProviderConfig) -> Result<Plan, ProtocolError> {
    let verb = request.verb.ok_or(ProtocolError::BadVerb)?;
    if !request.unknown_arguments.is_empty() {
        return Err(ProtocolError::BadArgument);
    }
    match verb {
        Verb::Identify => {
            if request.has_selection_arguments() || request.resumption_token.is_some() {
                return Err(ProtocolError::BadArgument);
            }
            Ok(Plan::Identify)
        }
        Verb::ListMetadataFormats => {
            if request.requested_prefix.is_some()
                || request.from.is_some()
                || request.until.is_some()
                || request.set_spec.is_some()
                || request.resumption_token.is_some()
            {
                return Err(ProtocolError::BadArgument);
            }
            Ok(Plan::ListMetadataFormats {
                identifier: request.identifier.clone(),
            })
        }
        Verb::ListSets => {
            if request.has_selection_arguments() {
                return Err(ProtocolError::BadArgument);
            }
            if request.resumption_token.is_some() {
                // Set lists are never split across pages.
                return Err(ProtocolError::BadResumptionToken);
            }
            if !config.has_set_hierarchy() {
                return Err(ProtocolError::NoSetHierarchy);
            }
            Ok(Plan::ListSets)
        }
        Verb::GetRecord => {
            if request.from.is_some()
                || request.until.is_some()
                || request.set_spec.is_some()
                || request.resumption_token.is_some()
            {
                return Err(ProtocolError::BadArgument);
            }
            let identifier = request
                .identifier
                .clone()
                .ok_or(ProtocolError::BadArgument)?;
            let format = resolve_format(verb, request, config)?;
            Ok(Plan::GetRecord { identifier, format })
        }
        Verb::ListIdentifiers | Verb::ListRecords => {
            if let Some(token_name) = request.resumption_token.clone() {
                if request.has_selection_arguments() {
                    return Err(ProtocolError::BadArgument);
                }
                return Ok(Plan::Resume { verb, token_name });
            }
            plan_list(verb, request, config).map(Plan::List)
        }
    }
}

/// Validates the selection arguments of a fresh list request. Also used to
/// re-derive the selection stored inside a resumption token.
pub fn plan_list(
    verb: Verb,
    request: &HarvestRequest,
    config: &ProviderConfig,
) -> Result<ListPlan, ProtocolError> {
    if !verb.is_list() {
        return Err(ProtocolError::BadVerb);
    }
    if request.identifier.is_some() {
        return Err(ProtocolError::BadArgument);
    }
    let format = resolve_format(verb, request, config)?;
    let from = request.from.as_deref();
    let until = request.until.as_deref();
    if !check_window(from, until) {
        return Err(ProtocolError::BadArgument);
    }
    let window = to_millis_window(from, until).ok_or(ProtocolError::BadArgument)?;
    if request.set_spec.is_some() && !config.has_set_hierarchy() {
        return Err(ProtocolError::NoSetHierarchy);
    }
    Ok(ListPlan {
        verb,
        format,
        set_spec: request.set_spec.clone(),
        window,
        request: request.clone(),
    })
}

/// Missing prefix is a bad argument; an unknown one, or one disabled for
/// `verb`, cannot be disseminated.
fn resolve_format(
    verb: Verb,
    request: &HarvestRequest,
    config: &ProviderConfig,
) -> Result<MetadataFormat, ProtocolError> {
    if request.requested_prefix.is_none() {
        return Err(ProtocolError::BadArgument);
    }
    request
        .metadata_prefix
        .filter(|format| config.formats.enabled_for(*format, verb).is_some())
        .ok_or(ProtocolError::CannotDisseminateFormat)
}
