//! Time-bounded cache in front of the timeline upstream.

use std::{
    sync::{Arc, Mutex, PoisonError, RwLock},
    time::Duration,
};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{
    error::{UpstreamError, UpstreamResult},
    source::EventSource,
};

/// How long a fetched timeline is served before it is fetched again.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A refresh running on its own task, awaited by every request that missed.
type Refresh = Shared<BoxFuture<'static, UpstreamResult<Arc<Vec<Value>>>>>;

/// One successful fetch.
#[derive(Debug, Clone)]
struct CacheEntry {
    events: Arc<Vec<Value>>,
    fetched_at: Instant,
}

/// What the cache currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freshness {
    /// Nothing was fetched successfully yet.
    Absent,
    /// An entry exists but is older than the TTL.
    Stale,
    /// An entry exists and is served without asking the upstream.
    Fresh,
}

/// State the refresh task writes back into.
#[derive(Default)]
struct CacheState {
    slot: RwLock<Option<CacheEntry>>,
    in_flight: Mutex<Option<Refresh>>,
}

impl CacheState {
    fn entry(&self) -> Option<CacheEntry> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, entry: CacheEntry) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(entry);
    }

    fn finish_refresh(&self) {
        *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Memoizes the upstream timeline for a fixed TTL.
///
/// Concurrent misses share a single upstream request. That request runs on its own task, so a
/// caller that goes away only stops waiting; the fetch still completes and fills the cache. A
/// failed refresh is reported to the caller even when an older entry is still held, and that
/// entry is kept.
pub struct EventCache {
    source: Arc<dyn EventSource>,
    ttl: Duration,
    state: Arc<CacheState>,
}

impl EventCache {
    pub fn new(source: Arc<dyn EventSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            state: Arc::default(),
        }
    }

    /// Get the timeline, fetching it when the cached one is missing or too old.
    pub async fn get_events(&self) -> UpstreamResult<Arc<Vec<Value>>> {
        if let Some(events) = self.fresh_events(Instant::now()) {
            debug!(count = events.len(), "timeline cache hit");
            return Ok(events);
        }
        let refresh = {
            let mut in_flight = self
                .state
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            if let Some(events) = self.fresh_events(now) {
                debug!(count = events.len(), "timeline refreshed by a concurrent request");
                return Ok(events);
            }
            match in_flight.as_ref() {
                Some(refresh) => {
                    debug!("joining timeline refresh in flight");
                    refresh.clone()
                }
                None => {
                    debug!(state = ?self.freshness_at(now), "timeline cache miss");
                    let refresh = self.start_refresh(now);
                    *in_flight = Some(refresh.clone());
                    refresh
                }
            }
        };
        refresh.await
    }

    /// Spawn the upstream fetch. The task stores a successful result and clears the
    /// in-flight marker whether or not anyone is still waiting.
    fn start_refresh(&self, fetched_at: Instant) -> Refresh {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            let result = source.fetch().await.map(Arc::new);
            if let Ok(events) = &result {
                info!(count = events.len(), "fetched timeline");
                state.store(CacheEntry {
                    events: Arc::clone(events),
                    fetched_at,
                });
            }
            state.finish_refresh();
            result
        });
        async move { task.await.unwrap_or_else(|err| Err(UpstreamError::transport(err))) }
            .boxed()
            .shared()
    }

    fn is_fresh(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.fetched_at) < self.ttl
    }

    fn fresh_events(&self, now: Instant) -> Option<Arc<Vec<Value>>> {
        self.state
            .entry()
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.events)
    }

    #[cfg(test)]
    fn freshness(&self) -> Freshness {
        self.freshness_at(Instant::now())
    }

    fn freshness_at(&self, now: Instant) -> Freshness {
        match self.state.entry() {
            None => Freshness::Absent,
            Some(entry) if self.is_fresh(&entry, now) => Freshness::Fresh,
            Some(_) => Freshness::Stale,
        }
    }
}
