use crate::remote::outbox::{BackendCommand, RemoteMessage, RemoteOutbox};
use playback_core::playback::{
    BackendError, BackendKind, MediaSource, PlaybackBackend, PlaybackToken, Progress,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Default)]
struct LoadState {
    token: Option<PlaybackToken>,
    progress: Option<Progress>,
}

/// Backend driven by the page: commands are queued in the outbox and the
/// page reports events back over HTTP.
///
/// The native element pushes its own time updates. The embedded player does
/// not, so its progress reports are stored here and polled by the engine.
pub(crate) struct RemoteBackend {
    kind: BackendKind,
    outbox: Arc<RemoteOutbox>,
    state: Mutex<LoadState>,
}

impl RemoteBackend {
    pub(crate) fn new(kind: BackendKind, outbox: Arc<RemoteOutbox>) -> Self {
        Self {
            kind,
            outbox,
            state: Mutex::new(LoadState::default()),
        }
    }

    /// Stores a progress report. Reports for another load are dropped;
    /// returns whether the report was kept.
    pub(crate) fn report_progress(&self, token: PlaybackToken, progress: Progress) -> bool {
        let mut state = self.lock();
        if state.token != Some(token) {
            debug!(backend = ?self.kind, generation = token.generation, "Dropping stale progress report");
            return false;
        }

        state.progress.replace(progress);
        true
    }

    fn send(&self, command: BackendCommand) -> Result<(), BackendError> {
        self.outbox.push(RemoteMessage::Backend {
            backend: self.kind,
            command,
        });

        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PlaybackBackend for RemoteBackend {
    fn load(&self, source: &MediaSource, token: PlaybackToken) -> Result<(), BackendError> {
        *self.lock() = LoadState {
            token: Some(token),
            progress: None,
        };

        self.send(BackendCommand::Load {
            source: source.clone(),
            token,
        })
    }

    fn play(&self) -> Result<(), BackendError> {
        self.send(BackendCommand::Play)
    }

    fn pause(&self) -> Result<(), BackendError> {
        self.send(BackendCommand::Pause)
    }

    fn seek(&self, position: f64) -> Result<(), BackendError> {
        self.send(BackendCommand::Seek { position })
    }

    fn set_volume(&self, level: u8) -> Result<(), BackendError> {
        self.send(BackendCommand::SetVolume { level })
    }

    fn stop(&self) -> Result<(), BackendError> {
        *self.lock() = LoadState::default();
        self.send(BackendCommand::Stop)
    }

    fn pushes_progress(&self) -> bool {
        self.kind == BackendKind::Native
    }

    fn progress(&self) -> Option<Progress> {
        self.lock().progress
    }
}
