use std::fs;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use pmh_core::{is_valid_token_name, ResumptionToken, TokenNamer};
use pmh_logging::{pmh_debug, pmh_warn};
use tempfile::NamedTempFile;

use super::{TokenDraft, TokenStore};
use crate::StoreError;

const TOKEN_EXTENSION: &str = "json";
const LOCK_STRIPES: usize = 64;

/// Stores each token as `{dir}/{name}.json`.
///
/// Files are written to a temp file and renamed into place, so a reader
/// never sees a partial token. Names hash onto a fixed set of lock stripes,
/// so operations on one name are serialized while most others proceed in
/// parallel, and the lock table never grows.
#[derive(Debug)]
pub struct FileTokenStore {
    dir: PathBuf,
    namer: TokenNamer,
    ttl: Duration,
    locks: Box<[Mutex<()>]>,
}

impl FileTokenStore {
    /// Opens (creating if needed) the token directory.
    pub fn open(dir: impl Into<PathBuf>, ttl: std::time::Duration) -> Result<Self, StoreError> {
        let dir = dir.into();
        ensure_token_dir(&dir)?;
        Ok(Self {
            dir,
            namer: TokenNamer::new(),
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
            locks: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{TOKEN_EXTENSION}"))
    }

    fn lock_for(&self, name: &str) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        let stripe = (hasher.finish() % self.locks.len() as u64) as usize;
        self.locks[stripe]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self, name: &str) -> Result<Option<ResumptionToken>, StoreError> {
        let content = match fs::read(self.path_for(name)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_slice(&content) {
            Ok(token) => Ok(Some(token)),
            Err(err) => {
                pmh_warn!("Ignoring unreadable token {}: {}", name, err);
                Ok(None)
            }
        }
    }

    fn write(&self, token: &ResumptionToken) -> Result<(), StoreError> {
        let content = serde_json::to_vec(token)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(self.path_for(&token.token_name))
            .map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool, StoreError> {
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn stored_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .filter_map(|e| {
                let path = e.path();
                if path.extension().and_then(|s| s.to_str()) != Some(TOKEN_EXTENSION) {
                    return None;
                }
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .filter(|name| is_valid_token_name(name))
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Ensure the token directory exists and is writable.
fn ensure_token_dir(dir: &Path) -> Result<(), StoreError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| StoreError::TokenDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(StoreError::TokenDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| StoreError::TokenDir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| StoreError::TokenDir(e.to_string()))?;
    Ok(())
}

impl TokenStore for FileTokenStore {
    fn create(&self, draft: TokenDraft, now: DateTime<Utc>) -> Result<ResumptionToken, StoreError> {
        let token = ResumptionToken {
            token_name: self.namer.next_name(now),
            virtual_hits: draft.virtual_hits,
            raw_hits: draft.raw_hits,
            position: draft.position,
            expiration_date: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            original_request: draft.original_request,
        };
        let _guard = self.lock_for(&token.token_name);
        self.write(&token)?;
        pmh_debug!("Stored resumption token {}", token.token_name);
        Ok(token)
    }

    fn lookup(&self, name: &str, now: DateTime<Utc>) -> Result<Option<ResumptionToken>, StoreError> {
        if !is_valid_token_name(name) {
            return Ok(None);
        }
        let _guard = self.lock_for(name);
        Ok(self.read(name)?.filter(|token| !token.has_expired(now)))
    }

    fn delete(&self, name: &str) -> Result<bool, StoreError> {
        if !is_valid_token_name(name) {
            return Ok(false);
        }
        let _guard = self.lock_for(name);
        self.remove(name)
    }

    fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut removed = 0;
        for name in self.stored_names()? {
            let _guard = self.lock_for(&name);
            let expired = match self.read(&name)? {
                Some(token) => token.has_expired(now),
                // Unreadable leftovers are swept as well.
                None => true,
            };
            if expired && self.remove(&name)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
