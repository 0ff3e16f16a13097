use crate::{MediaId, StreamUrl, TrackId};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub id: TrackId,
    pub query: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub media_id: Option<MediaId>,
    /// Ephemeral, re-derived every session.
    #[serde(skip)]
    pub stream_url: Option<StreamUrl>,
}

impl TrackDescriptor {
    pub fn new(id: impl Into<TrackId>, query: &str, title: &str) -> Self {
        Self {
            id: id.into(),
            query: query.to_string(),
            title: title.to_string(),
            subtitle: None,
            media_id: None,
            stream_url: None,
        }
    }

    pub fn with_subtitle(mut self, subtitle: &str) -> Self {
        self.subtitle.replace(subtitle.to_string());
        self
    }

    pub fn with_media_id(mut self, media_id: impl Into<MediaId>) -> Self {
        self.media_id.replace(media_id.into());
        self
    }
}

/// The caller's track list, shared between the engine and background
/// prefetches. Every mutation is a merge keyed by track identity.
#[derive(Clone, Default)]
pub struct TrackList {
    tracks: Arc<Mutex<Vec<TrackDescriptor>>>,
}

impl TrackList {
    pub fn new(tracks: Vec<TrackDescriptor>) -> Self {
        Self {
            tracks: Arc::new(Mutex::new(tracks)),
        }
    }

    pub fn replace(&self, tracks: Vec<TrackDescriptor>) {
        *self.lock() = tracks;
    }

    pub fn snapshot(&self) -> Vec<TrackDescriptor> {
        self.lock().clone()
    }

    pub fn get(&self, index: usize) -> Option<TrackDescriptor> {
        self.lock().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self, track_id: &TrackId) -> Option<usize> {
        self.lock().iter().position(|track| &track.id == track_id)
    }

    /// Attaches a media id unless one is already attached, and returns the
    /// id the track ends up with. `None` when the track is not in the list.
    pub fn attach_media_id(&self, track_id: &TrackId, media_id: MediaId) -> Option<MediaId> {
        let mut tracks = self.lock();
        let track = tracks.iter_mut().find(|track| &track.id == track_id)?;

        Some(track.media_id.get_or_insert(media_id).clone())
    }

    pub fn set_stream_url(&self, track_id: &TrackId, stream_url: Option<StreamUrl>) {
        if let Some(track) = self.lock().iter_mut().find(|track| &track.id == track_id) {
            track.stream_url = stream_url;
        }
    }

    pub fn unresolved_indices(&self, except: usize) -> Vec<usize> {
        self.lock()
            .iter()
            .enumerate()
            .filter(|(index, track)| *index != except && track.media_id.is_none())
            .map(|(index, _)| index)
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TrackDescriptor>> {
        self.tracks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Native,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveBackend {
    #[default]
    None,
    Native,
    Fallback,
}

impl ActiveBackend {
    pub fn kind(&self) -> Option<BackendKind> {
        match self {
            ActiveBackend::None => None,
            ActiveBackend::Native => Some(BackendKind::Native),
            ActiveBackend::Fallback => Some(BackendKind::Fallback),
        }
    }
}

impl From<BackendKind> for ActiveBackend {
    fn from(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Native => ActiveBackend::Native,
            BackendKind::Fallback => ActiveBackend::Fallback,
        }
    }
}

/// Derived from the session. `Resolving` covers every selected track with no
/// active backend, including a track halted on a credential failure; the
/// snapshot's `halted` flag tells the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Resolving,
    NativePlayback,
    FallbackPlayback,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackSession {
    pub current_index: Option<usize>,
    pub playing: bool,
    pub shuffle: bool,
    pub active_backend: ActiveBackend,
    pub position: f64,
    pub duration: f64,
}

impl PlaybackSession {
    pub fn state(&self) -> EngineState {
        match (self.current_index, self.active_backend) {
            (None, _) => EngineState::Idle,
            (Some(_), ActiveBackend::None) => EngineState::Resolving,
            (Some(_), ActiveBackend::Native) => EngineState::NativePlayback,
            (Some(_), ActiveBackend::Fallback) => EngineState::FallbackPlayback,
        }
    }
}

/// Identifies one load issued by the engine. Results and backend events
/// carrying an older generation are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackToken {
    pub generation: u64,
}

impl PlaybackToken {
    pub fn new(generation: u64) -> Self {
        Self { generation }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MediaSource {
    Stream(StreamUrl),
    Embedded(MediaId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendEvent {
    MetadataReady { duration: f64 },
    TimeUpdate { position: f64, duration: f64 },
    Playing,
    Paused,
    Ended,
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub position: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub state: EngineState,
    pub current_index: Option<usize>,
    pub current_track: Option<TrackId>,
    pub playing: bool,
    pub shuffle: bool,
    pub active_backend: ActiveBackend,
    pub position: f64,
    pub duration: f64,
    pub volume: u8,
    /// Automatic advancement stopped until the next explicit selection,
    /// e.g. while waiting for credentials.
    pub halted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineNotice {
    Searching { track_id: TrackId, title: String },
    NowPlaying { track_id: TrackId, title: String, backend: BackendKind },
    TrackNotFound { track_id: TrackId, title: String },
    SearchFailed { track_id: TrackId, title: String, reason: String },
    CredentialsRequired,
    CredentialsRejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaAction {
    Play,
    Pause,
    PreviousTrack,
    NextTrack,
    SeekForward,
    SeekBackward,
}

impl MediaAction {
    pub const ALL: [MediaAction; 6] = [
        MediaAction::Play,
        MediaAction::Pause,
        MediaAction::PreviousTrack,
        MediaAction::NextTrack,
        MediaAction::SeekForward,
        MediaAction::SeekBackward,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artwork {
    pub src: String,
    pub sizes: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaMetadata {
    pub title: String,
    pub subtitle: String,
    pub album: Option<String>,
    pub artwork: Vec<Artwork>,
}

impl MediaMetadata {
    pub fn for_track(track: &TrackDescriptor, artwork_base: &str, album: Option<&str>) -> Self {
        let artwork = track
            .media_id
            .as_ref()
            .map(|media_id| {
                [("mqdefault", "320x180"), ("hqdefault", "480x360")]
                    .into_iter()
                    .map(|(name, sizes)| Artwork {
                        src: format!("{}/{}/{}.jpg", artwork_base, media_id, name),
                        sizes: sizes.to_string(),
                        mime_type: "image/jpeg".to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            title: track.title.clone(),
            subtitle: track.subtitle.clone().unwrap_or_default(),
            album: album.map(str::to_string),
            artwork,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaPlaybackState {
    None,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionState {
    pub duration: f64,
    pub position: f64,
    pub playback_rate: f64,
}
