use playback_core::playback::{
    BackendKind, EngineNotice, MediaAction, MediaMetadata, MediaPlaybackState, MediaSource,
    PlaybackToken, PositionState,
};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

const OUTBOX_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum BackendCommand {
    Load {
        source: MediaSource,
        token: PlaybackToken,
    },
    Play,
    Pause,
    Seek {
        position: f64,
    },
    SetVolume {
        level: u8,
    },
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum KeepAliveCommand {
    Resume,
    Suspend,
    Teardown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum MediaSessionUpdate {
    RegisterActions { actions: Vec<MediaAction> },
    ClearActions,
    Metadata { metadata: Option<MediaMetadata> },
    PlaybackState { state: MediaPlaybackState },
    PositionState { state: PositionState },
}

/// Instruction for the page that hosts the audio elements.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub(crate) enum RemoteMessage {
    Backend {
        backend: BackendKind,
        command: BackendCommand,
    },
    KeepAlive {
        command: KeepAliveCommand,
    },
    MediaSession {
        update: MediaSessionUpdate,
    },
    Notice {
        notice: EngineNotice,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct OutboxEntry {
    pub(crate) sequence: u64,
    #[serde(flatten)]
    pub(crate) message: RemoteMessage,
}

#[derive(Default)]
struct OutboxState {
    entries: VecDeque<OutboxEntry>,
    next_sequence: u64,
}

/// Queue of messages waiting for the page to poll them. Sequence numbers
/// keep increasing across drains so the page can spot dropped messages.
pub(crate) struct RemoteOutbox {
    capacity: usize,
    state: Mutex<OutboxState>,
}

impl Default for RemoteOutbox {
    fn default() -> Self {
        Self::with_capacity(OUTBOX_CAPACITY)
    }
}

impl RemoteOutbox {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(OutboxState::default()),
        }
    }

    pub(crate) fn push(&self, message: RemoteMessage) {
        let mut state = self.lock();

        if state.entries.len() >= self.capacity {
            if let Some(dropped) = state.entries.pop_front() {
                warn!(sequence = dropped.sequence, "Outbox full, dropping oldest message");
            }
        }

        state.next_sequence += 1;
        let sequence = state.next_sequence;
        state.entries.push_back(OutboxEntry { sequence, message });
    }

    pub(crate) fn drain(&self) -> Vec<OutboxEntry> {
        self.lock().entries.drain(..).collect()
    }

    fn lock(&self) -> MutexGuard<'_, OutboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
