//! Resumption token values and their opaque names.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cursor::CursorPosition;
use crate::request::HarvestRequest;

pub const TOKEN_NAME_PREFIX: &str = "oai_";
const TOKEN_DIGITS: usize = 13;
const MAX_TOKEN_VALUE: i64 = 9_999_999_999_999;

/// State needed to serve the next page of a harvest. Never mutated once
/// stored; each page yields a fresh successor or none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumptionToken {
    pub token_name: String,
    pub virtual_hits: u64,
    pub raw_hits: u64,
    pub position: CursorPosition,
    pub expiration_date: DateTime<Utc>,
    pub original_request: HarvestRequest,
}

impl ResumptionToken {
    /// A token is expired strictly after its expiration instant.
    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiration_date
    }
}

/// Checks `name` against `oai_` followed by exactly 13 ASCII digits.
pub fn is_valid_token_name(name: &str) -> bool {
    name.strip_prefix(TOKEN_NAME_PREFIX)
        .is_some_and(|digits| digits.len() == TOKEN_DIGITS && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Mints token names from the millisecond clock.
///
/// Each name is `max(now, previous + 1)`, so two tokens created within the
/// same millisecond still get distinct names.
#[derive(Debug, Default)]
pub struct TokenNamer {
    last: AtomicI64,
}

impl TokenNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_name(&self, now: DateTime<Utc>) -> String {
        let now_millis = now.timestamp_millis().clamp(0, MAX_TOKEN_VALUE);
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now_millis.max(previous + 1).min(MAX_TOKEN_VALUE);
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return format!("{TOKEN_NAME_PREFIX}{candidate:013}"),
                Err(actual) => previous = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn name_pattern_is_strict() {
        assert!(is_valid_token_name("oai_1443621600000"));
        assert!(!is_valid_token_name("oai_144362160000"));
        assert!(!is_valid_token_name("oai_14436216000000"));
        assert!(!is_valid_token_name("oai_14436216000x0"));
        assert!(!is_valid_token_name("xyz_1443621600000"));
        assert!(!is_valid_token_name("../../etc/passwd"));
        assert!(!is_valid_token_name(""));
    }

    #[test]
    fn names_are_unique_within_one_millisecond() {
        let namer = TokenNamer::new();
        let now = Utc.timestamp_millis_opt(1_443_621_600_000).unwrap();
        let first = namer.next_name(now);
        let second = namer.next_name(now);
        assert_eq!(first, "oai_1443621600000");
        assert_eq!(second, "oai_1443621600001");
        assert!(is_valid_token_name(&second));
    }

    #[test]
    fn expiry_is_exclusive_of_the_deadline() {
        let deadline = Utc.timestamp_millis_opt(1_443_621_600_000).unwrap();
        let token = ResumptionToken {
            token_name: "oai_1443621600000".into(),
            virtual_hits: 1,
            raw_hits: 1,
            position: CursorPosition::default(),
            expiration_date: deadline,
            original_request: HarvestRequest::default(),
        };
        assert!(!token.has_expired(deadline - Duration::seconds(1)));
        assert!(!token.has_expired(deadline));
        assert!(token.has_expired(deadline + Duration::milliseconds(1)));
    }
}
