use crate::resolution::cache::{CacheLookup, CachePolicy, ResolutionCache};
use crate::resolution::traits::{MirrorError, MirrorProvider};
use crate::resolution::types::{select_audio_stream, MirrorFamily};
use crate::{MediaId, StreamUrl, TrackError};
use futures_util::stream::{FuturesUnordered, StreamExt};
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct StreamResolverConfig {
    /// Family A endpoints raced per attempt.
    pub primary_picks: usize,
    /// Family B endpoints raced per attempt, never fewer than one.
    pub secondary_picks: usize,
    pub request_timeout: Duration,
    /// Lifetime of a resolved URL; mirrors sign URLs for roughly six hours.
    pub positive_ttl: Duration,
    pub negative_ttl: Duration,
}

impl Default for StreamResolverConfig {
    fn default() -> Self {
        Self {
            primary_picks: 2,
            secondary_picks: 1,
            request_timeout: Duration::from_secs(5),
            positive_ttl: Duration::from_secs(5 * 60 * 60),
            negative_ttl: Duration::from_secs(30),
        }
    }
}

/// Turns media identifiers into directly playable stream URLs by racing a
/// random subset of mirror providers.
pub struct StreamResolver {
    providers: Vec<Arc<dyn MirrorProvider>>,
    cache: ResolutionCache<StreamUrl>,
    config: StreamResolverConfig,
}

impl StreamResolver {
    pub fn new(providers: Vec<Arc<dyn MirrorProvider>>, config: StreamResolverConfig) -> Self {
        let cache = ResolutionCache::new(CachePolicy::stream_urls(
            config.positive_ttl,
            config.negative_ttl,
        ));

        Self {
            providers,
            cache,
            config,
        }
    }

    /// Returns `None` once every raced provider failed or timed out. The
    /// caller is expected to fall back to the embedded backend.
    pub async fn resolve_stream_url(&self, media_id: &MediaId) -> Option<StreamUrl> {
        match self.cache.lookup(media_id) {
            CacheLookup::Hit(url) => {
                debug!(%media_id, "Stream URL served from cache");
                return Some(url);
            }
            CacheLookup::Failed => {
                debug!(%media_id, "Stream resolution recently failed, skipping mirrors");
                return None;
            }
            CacheLookup::Miss => (),
        }

        let candidates = self.pick_candidates();
        if candidates.is_empty() {
            warn!("No mirror providers configured");
            return None;
        }

        match self.race(media_id, candidates).await {
            Some(url) => {
                self.cache.insert(media_id, url.clone());
                Some(url)
            }
            None => {
                info!(%media_id, "Every mirror failed to provide a stream");
                self.cache.insert_failure(media_id);
                None
            }
        }
    }

    /// Drops any cached outcome for the media id, e.g. after the native
    /// backend failed on an expired URL.
    pub fn evict(&self, media_id: &MediaId) -> bool {
        self.cache.evict(media_id)
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    fn pick_candidates(&self) -> Vec<Arc<dyn MirrorProvider>> {
        let mut rng = rand::thread_rng();
        let of_family = |family: MirrorFamily| {
            self.providers
                .iter()
                .filter(|provider| provider.family() == family)
                .cloned()
                .collect::<Vec<_>>()
        };

        let primary = of_family(MirrorFamily::Primary);
        let secondary = of_family(MirrorFamily::Secondary);

        primary
            .choose_multiple(&mut rng, self.config.primary_picks)
            .chain(secondary.choose_multiple(&mut rng, self.config.secondary_picks.max(1)))
            .cloned()
            .collect()
    }

    async fn race(
        &self,
        media_id: &MediaId,
        candidates: Vec<Arc<dyn MirrorProvider>>,
    ) -> Option<StreamUrl> {
        let timeout = self.config.request_timeout;

        let mut in_flight = candidates
            .into_iter()
            .map(|provider| async move {
                let outcome = match tokio::time::timeout(timeout, provider.audio_streams(media_id))
                    .await
                {
                    Err(_) | Ok(Err(MirrorError::Timeout)) => Err(TrackError::Timeout),
                    Ok(Err(error)) => Err(TrackError::Transient(error.to_string())),
                    Ok(Ok(streams)) => select_audio_stream(streams)
                        .map(|stream| StreamUrl::from(stream.url))
                        .ok_or_else(|| TrackError::NotFound(media_id.to_string())),
                };
                (provider, outcome)
            })
            .collect::<FuturesUnordered<_>>();

        // First success wins; whatever is still in flight is dropped with the set.
        while let Some((provider, outcome)) = in_flight.next().await {
            match outcome {
                Ok(url) => {
                    info!(%media_id, provider = provider.name(), "Stream URL resolved");
                    return Some(url);
                }
                Err(error) => {
                    debug!(%media_id, provider = provider.name(), ?error, "Mirror attempt failed");
                }
            }
        }

        None
    }
}
