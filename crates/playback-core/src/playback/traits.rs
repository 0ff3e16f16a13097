use crate::playback::types::{
    EngineNotice, MediaAction, MediaMetadata, MediaPlaybackState, MediaSource, PlaybackToken,
    PositionState, Progress,
};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend rejected the command: {0}")]
    Rejected(String),
    #[error("Backend is not available")]
    Unavailable,
}

/// Control surface shared by the native stream backend and the embedded
/// fallback backend. Events flow back through
/// [`PlaybackEngine::handle_backend_event`](crate::playback::PlaybackEngine::handle_backend_event)
/// tagged with the token passed to `load`.
pub trait PlaybackBackend: Send + Sync {
    fn load(&self, source: &MediaSource, token: PlaybackToken) -> Result<(), BackendError>;

    fn play(&self) -> Result<(), BackendError>;

    fn pause(&self) -> Result<(), BackendError>;

    fn seek(&self, position: f64) -> Result<(), BackendError>;

    fn set_volume(&self, level: u8) -> Result<(), BackendError>;

    fn stop(&self) -> Result<(), BackendError>;

    /// Whether the backend pushes time updates on its own. Backends that do
    /// not are polled through [`PlaybackBackend::progress`].
    fn pushes_progress(&self) -> bool {
        true
    }

    fn progress(&self) -> Option<Progress> {
        None
    }
}

/// Lock-screen / media-key integration. Optional for the engine.
pub trait MediaSessionHost: Send + Sync {
    fn register_actions(&self, actions: &[MediaAction]);

    fn clear_actions(&self);

    fn set_metadata(&self, metadata: Option<MediaMetadata>);

    fn set_playback_state(&self, state: MediaPlaybackState);

    fn set_position_state(&self, state: PositionState);
}

/// Silent looping signal that keeps the embedded backend alive while the
/// page is in the background.
pub trait KeepAlive: Send + Sync {
    /// Starts the signal, creating it on first use.
    fn resume(&self);

    fn suspend(&self);

    fn teardown(&self);
}

pub trait EngineListener: Send + Sync {
    fn notify(&self, notice: EngineNotice);
}
