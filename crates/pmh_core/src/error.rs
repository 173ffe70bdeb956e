use serde::Serialize;

/// Protocol-level error codes. These are never retried and are returned to
/// the rendering layer as values, not propagated as failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
pub enum ProtocolError {
    #[error("badArgument")]
    BadArgument,
    #[error("badResumptionToken")]
    BadResumptionToken,
    #[error("badVerb")]
    BadVerb,
    #[error("cannotDisseminateFormat")]
    CannotDisseminateFormat,
    #[error("idDoesNotExist")]
    IdDoesNotExist,
    #[error("noMetadataFormats")]
    NoMetadataFormats,
    #[error("noRecordsMatch")]
    NoRecordsMatch,
    #[error("noSetHierarchy")]
    NoSetHierarchy,
}

impl ProtocolError {
    /// Wire code, as it appears in the `code` attribute of an error element.
    pub fn code(self) -> &'static str {
        match self {
            ProtocolError::BadArgument => "badArgument",
            ProtocolError::BadResumptionToken => "badResumptionToken",
            ProtocolError::BadVerb => "badVerb",
            ProtocolError::CannotDisseminateFormat => "cannotDisseminateFormat",
            ProtocolError::IdDoesNotExist => "idDoesNotExist",
            ProtocolError::NoMetadataFormats => "noMetadataFormats",
            ProtocolError::NoRecordsMatch => "noRecordsMatch",
            ProtocolError::NoSetHierarchy => "noSetHierarchy",
        }
    }

    /// Fixed prose accompanying the code.
    pub fn message(self) -> &'static str {
        match self {
            ProtocolError::BadArgument => {
                "The request includes illegal arguments, is missing required arguments, includes a repeated argument, or values for arguments have an illegal syntax."
            }
            ProtocolError::BadResumptionToken => {
                "The value of the resumptionToken argument is invalid or expired."
            }
            ProtocolError::BadVerb => {
                "Value of the verb argument is not a legal OAI-PMH verb, the verb argument is missing, or the verb argument is repeated."
            }
            ProtocolError::CannotDisseminateFormat => {
                "The metadata format identified by the value given for the metadataPrefix argument is not supported by the item or by the repository."
            }
            ProtocolError::IdDoesNotExist => {
                "The value of the identifier argument is unknown or illegal in this repository."
            }
            ProtocolError::NoMetadataFormats => {
                "There are no metadata formats available for the specified item."
            }
            ProtocolError::NoRecordsMatch => {
                "The combination of the values of the from, until, set and metadataPrefix arguments results in an empty list."
            }
            ProtocolError::NoSetHierarchy => "The repository does not support sets.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ProtocolError;

    #[test]
    fn display_matches_wire_code() {
        let all = [
            ProtocolError::BadArgument,
            ProtocolError::BadResumptionToken,
            ProtocolError::BadVerb,
            ProtocolError::CannotDisseminateFormat,
            ProtocolError::IdDoesNotExist,
            ProtocolError::NoMetadataFormats,
            ProtocolError::NoRecordsMatch,
            ProtocolError::NoSetHierarchy,
        ];
        for err in all {
            assert_eq!(err.to_string(), err.code());
            assert!(!err.message().is_empty());
        }
    }
}
