use crate::playback::types::{TrackDescriptor, TrackList};
use crate::resolution::{CredentialProvider, TrackResolver};
use crate::MediaId;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Which track to warm up while shuffling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShufflePrefetch {
    /// First track in list order that has no media id yet.
    #[default]
    FirstUnresolved,
    /// A random track that has no media id yet.
    RandomUnresolved,
}

/// Resolves the media id of the upcoming track in the background. Stream
/// URLs are never prefetched: they are short-lived and the track may never
/// play.
#[derive(Clone)]
pub struct PrefetchScheduler {
    tracks: TrackList,
    track_resolver: Arc<TrackResolver>,
    credentials: Arc<dyn CredentialProvider>,
    shuffle_policy: ShufflePrefetch,
}

impl PrefetchScheduler {
    pub fn new(
        tracks: TrackList,
        track_resolver: Arc<TrackResolver>,
        credentials: Arc<dyn CredentialProvider>,
        shuffle_policy: ShufflePrefetch,
    ) -> Self {
        Self {
            tracks,
            track_resolver,
            credentials,
            shuffle_policy,
        }
    }

    /// Index of the track worth prefetching after `current`, if any.
    pub fn next_candidate(&self, current: usize, shuffle: bool) -> Option<usize> {
        if shuffle {
            let unresolved = self.tracks.unresolved_indices(current);
            return match self.shuffle_policy {
                ShufflePrefetch::FirstUnresolved => unresolved.first().copied(),
                ShufflePrefetch::RandomUnresolved => {
                    unresolved.choose(&mut rand::thread_rng()).copied()
                }
            };
        }

        let next = current + 1;
        match self.tracks.get(next) {
            Some(track) if track.media_id.is_none() => Some(next),
            _ => None,
        }
    }

    /// Spawns a background resolution for the upcoming track. Returns `None`
    /// when there is nothing to prefetch.
    pub fn schedule(&self, current: usize, shuffle: bool) -> Option<JoinHandle<()>> {
        let index = self.next_candidate(current, shuffle)?;
        let track = self.tracks.get(index)?;
        let scheduler = self.clone();

        debug!(index, track_id = %track.id, "Scheduling prefetch");

        Some(tokio::spawn(async move {
            scheduler.prefetch(track).await;
        }))
    }

    /// Resolves and attaches the media id of a track. Failures are logged
    /// and swallowed.
    pub async fn prefetch(&self, track: TrackDescriptor) -> Option<MediaId> {
        if let Some(media_id) = track.media_id {
            return Some(media_id);
        }

        let credentials = match self.credentials.credentials().await {
            Ok(credentials) => credentials,
            Err(error) => {
                debug!(?error, "Skipping prefetch without credentials");
                return None;
            }
        };

        match self
            .track_resolver
            .resolve_track_id(&track.query, &credentials)
            .await
        {
            Ok(Some(media_id)) => {
                info!(track_id = %track.id, %media_id, "Prefetched track id");
                self.tracks.attach_media_id(&track.id, media_id)
            }
            Ok(None) => {
                debug!(track_id = %track.id, "Prefetch found no candidate");
                None
            }
            Err(error) => {
                warn!(track_id = %track.id, ?error, "Silent prefetch search failed");
                None
            }
        }
    }
}
