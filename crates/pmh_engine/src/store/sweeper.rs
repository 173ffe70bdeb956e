use std::sync::Arc;
use std::time::Duration;

use pmh_logging::{pmh_debug, pmh_error, pmh_info};
use tokio::task::JoinHandle;

use super::{Clock, TokenStore};

/// Background task removing expired tokens on a fixed interval, regardless
/// of lookup traffic. The task stops when the handle is dropped.
#[derive(Debug)]
pub struct Sweeper {
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawns the sweep loop on the current tokio runtime. The first sweep
    /// runs immediately.
    pub fn spawn(store: Arc<dyn TokenStore>, interval: Duration, clock: Clock) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let store = store.clone();
                let now = clock();
                // File stores block on disk IO.
                let result = tokio::task::spawn_blocking(move || store.sweep_expired(now)).await;
                match result {
                    Ok(Ok(0)) => pmh_debug!("Token sweep found nothing to remove"),
                    Ok(Ok(removed)) => pmh_info!("Token sweep removed {} expired token(s)", removed),
                    Ok(Err(err)) => pmh_error!("Token sweep failed: {}", err),
                    Err(err) => pmh_error!("Token sweep task panicked: {}", err),
                }
            }
        });
        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryTokenStore, TokenDraft};
    use chrono::{TimeZone, Utc};
    use pmh_core::{CursorPosition, HarvestRequest};

    #[tokio::test]
    async fn sweeper_removes_expired_tokens_without_lookups() {
        let store = Arc::new(MemoryTokenStore::new(Duration::from_secs(1)));
        let created_at = Utc.timestamp_millis_opt(1_443_621_600_000).unwrap();
        store
            .create(
                TokenDraft {
                    virtual_hits: 2,
                    raw_hits: 2,
                    position: CursorPosition::default(),
                    original_request: HarvestRequest::default(),
                },
                created_at,
            )
            .unwrap();
        assert_eq!(store.len(), 1);

        let later = created_at + chrono::Duration::seconds(5);
        let clock: Clock = Arc::new(move || later);
        let sweeper = Sweeper::spawn(store.clone(), Duration::from_millis(10), clock);
        for _ in 0..100 {
            if store.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        sweeper.stop();
        assert!(store.is_empty());
    }
}
