use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use pmh_core::{is_valid_token_name, ResumptionToken, TokenNamer};

use super::{TokenDraft, TokenStore};
use crate::StoreError;

/// Process-local token store. Each name lives in one `DashMap` shard, so
/// same-name operations are serialized by the shard lock.
#[derive(Debug)]
pub struct MemoryTokenStore {
    tokens: DashMap<String, ResumptionToken>,
    namer: TokenNamer,
    ttl: Duration,
}

impl MemoryTokenStore {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            namer: TokenNamer::new(),
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenStore for MemoryTokenStore {
    fn create(&self, draft: TokenDraft, now: DateTime<Utc>) -> Result<ResumptionToken, StoreError> {
        let token = ResumptionToken {
            token_name: self.namer.next_name(now),
            virtual_hits: draft.virtual_hits,
            raw_hits: draft.raw_hits,
            position: draft.position,
            expiration_date: now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            original_request: draft.original_request,
        };
        self.tokens.insert(token.token_name.clone(), token.clone());
        Ok(token)
    }

    fn lookup(&self, name: &str, now: DateTime<Utc>) -> Result<Option<ResumptionToken>, StoreError> {
        if !is_valid_token_name(name) {
            return Ok(None);
        }
        Ok(self
            .tokens
            .get(name)
            .filter(|token| !token.has_expired(now))
            .map(|token| token.clone()))
    }

    fn delete(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.tokens.remove(name).is_some())
    }

    fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let before = self.tokens.len();
        self.tokens.retain(|_, token| !token.has_expired(now));
        Ok(before.saturating_sub(self.tokens.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pmh_core::{CursorPosition, HarvestRequest};

    fn draft() -> TokenDraft {
        TokenDraft {
            virtual_hits: 30,
            raw_hits: 30,
            position: CursorPosition {
                raw_cursor: 10,
                virtual_cursor: 10,
                variant_offset: 0,
            },
            original_request: HarvestRequest::from_query_string(
                "verb=ListRecords&metadataPrefix=oai_dc",
            ),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_443_621_600_000).unwrap()
    }

    #[test]
    fn created_token_is_found_until_it_expires() {
        let store = MemoryTokenStore::new(std::time::Duration::from_secs(60));
        let token = store.create(draft(), now()).unwrap();
        assert_eq!(token.token_name, "oai_1443621600000");
        assert_eq!(token.expiration_date, now() + Duration::seconds(60));

        let at_deadline = store.lookup(&token.token_name, token.expiration_date).unwrap();
        assert_eq!(at_deadline.as_ref(), Some(&token));
        let after = token.expiration_date + Duration::milliseconds(1);
        assert_eq!(store.lookup(&token.token_name, after).unwrap(), None);
    }

    #[test]
    fn malformed_name_is_a_miss() {
        let store = MemoryTokenStore::new(std::time::Duration::from_secs(60));
        store.create(draft(), now()).unwrap();
        assert_eq!(store.lookup("oai_1443621600", now()).unwrap(), None);
        assert_eq!(store.lookup("1443621600000", now()).unwrap(), None);
    }

    #[test]
    fn sweep_removes_only_expired_tokens() {
        let store = MemoryTokenStore::new(std::time::Duration::from_secs(60));
        let old = store.create(draft(), now()).unwrap();
        let fresh = store
            .create(draft(), now() + Duration::seconds(30))
            .unwrap();
        let removed = store.sweep_expired(now() + Duration::seconds(61)).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.lookup(&old.token_name, now()).unwrap().is_none());
        assert!(store.lookup(&fresh.token_name, now()).unwrap().is_some());
    }
}
