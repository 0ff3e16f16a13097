use crate::resolution::cache::{CacheLookup, CachePolicy, ResolutionCache};
use crate::resolution::scorer::pick_best_candidate;
use crate::resolution::traits::{SearchEndpoint, SearchEndpointError};
use crate::resolution::types::{Credentials, SearchCandidate};
use crate::{MediaId, TrackError};
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const MIN_SEARCH_RESULTS: usize = 3;
const MAX_SEARCH_RESULTS: usize = 5;

#[derive(Clone, Debug)]
pub struct TrackResolverConfig {
    /// Candidates requested per search, kept within 3..=5.
    pub max_results: usize,
    /// Additional attempts after a transient failure.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub negative_ttl: Duration,
    pub batch_concurrency: usize,
    /// Pause each batch worker takes between two searches.
    pub batch_spacing: Duration,
}

impl Default for TrackResolverConfig {
    fn default() -> Self {
        Self {
            max_results: MAX_SEARCH_RESULTS,
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            negative_ttl: Duration::from_secs(60),
            batch_concurrency: 3,
            batch_spacing: Duration::from_millis(100),
        }
    }
}

/// Turns free-text queries into media identifiers.
pub struct TrackResolver {
    search_endpoint: Arc<dyn SearchEndpoint>,
    cache: ResolutionCache<MediaId>,
    config: TrackResolverConfig,
}

impl TrackResolver {
    pub fn new(search_endpoint: Arc<dyn SearchEndpoint>, config: TrackResolverConfig) -> Self {
        let cache = ResolutionCache::new(CachePolicy::track_ids(config.negative_ttl));

        Self {
            search_endpoint,
            cache,
            config,
        }
    }

    /// Resolves a query to a media identifier.
    ///
    /// `Ok(None)` means no acceptable candidate exists; that outcome is cached
    /// negatively. `TrackError::Auth` is returned without retrying.
    pub async fn resolve_track_id(
        &self,
        query: &str,
        credentials: &Credentials,
    ) -> Result<Option<MediaId>, TrackError> {
        match self.cache.lookup(query) {
            CacheLookup::Hit(media_id) => {
                debug!(query, %media_id, "Track id served from cache");
                return Ok(Some(media_id));
            }
            CacheLookup::Failed => {
                debug!(query, "Track id lookup recently failed, not searching again yet");
                return Ok(None);
            }
            CacheLookup::Miss => (),
        }

        let candidates = self.search_with_retry(query, credentials).await?;

        match pick_best_candidate(query, &candidates) {
            Some(media_id) => {
                info!(query, %media_id, candidates = candidates.len(), "Track id resolved");
                self.cache.insert(query, media_id.clone());
                Ok(Some(media_id))
            }
            None => {
                info!(query, "No acceptable candidate found");
                self.cache.insert_failure(query);
                Ok(None)
            }
        }
    }

    /// Resolves many queries with bounded concurrency. Failed and unresolved
    /// queries are left out of the result.
    pub async fn resolve_many(
        &self,
        queries: &[(usize, String)],
        credentials: &Credentials,
    ) -> HashMap<usize, MediaId> {
        let concurrency = self.config.batch_concurrency.max(1);
        let spacing = self.config.batch_spacing;

        stream::iter(queries)
            .map(|(index, query)| async move {
                let result = self.resolve_track_id(query, credentials).await;
                tokio::time::sleep(spacing).await;
                (*index, result)
            })
            .buffer_unordered(concurrency)
            .filter_map(|(index, result)| async move {
                match result {
                    Ok(Some(media_id)) => Some((index, media_id)),
                    Ok(None) => None,
                    Err(error) => {
                        warn!(index, ?error, "Batch track resolution failed");
                        None
                    }
                }
            })
            .collect()
            .await
    }

    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);

        self.config
            .base_delay
            .saturating_mul(factor)
            .min(self.config.max_delay)
    }

    pub fn evict(&self, query: &str) -> bool {
        self.cache.evict(query)
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    async fn search_with_retry(
        &self,
        query: &str,
        credentials: &Credentials,
    ) -> Result<Vec<SearchCandidate>, TrackError> {
        let max_results = self
            .config
            .max_results
            .clamp(MIN_SEARCH_RESULTS, MAX_SEARCH_RESULTS);
        let mut attempt = 0;

        loop {
            let error = match self
                .search_endpoint
                .search(query, credentials, max_results)
                .await
            {
                Ok(candidates) => return Ok(candidates),
                Err(SearchEndpointError::Unauthorized(status)) => {
                    warn!(query, status, "Search credentials were rejected");
                    return Err(TrackError::Auth);
                }
                Err(SearchEndpointError::Rejected(status)) => {
                    debug!(query, status, "Search request rejected, treating as no results");
                    return Ok(vec![]);
                }
                Err(error) => error,
            };

            if attempt >= self.config.max_retries {
                warn!(query, ?error, attempts = attempt + 1, "Search failed, giving up");
                return Err(match error {
                    SearchEndpointError::Timeout => TrackError::Timeout,
                    error => TrackError::Transient(error.to_string()),
                });
            }

            let delay = self.backoff_delay(attempt);
            debug!(query, ?error, ?delay, "Search failed, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
