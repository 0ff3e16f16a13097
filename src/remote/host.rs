use crate::remote::outbox::{KeepAliveCommand, MediaSessionUpdate, RemoteMessage, RemoteOutbox};
use playback_core::playback::{
    EngineListener, EngineNotice, KeepAlive, MediaAction, MediaMetadata, MediaPlaybackState,
    MediaSessionHost, PositionState,
};
use std::sync::Arc;
use tracing::info;

pub(crate) struct RemoteMediaSession(Arc<RemoteOutbox>);

impl RemoteMediaSession {
    pub(crate) fn new(outbox: Arc<RemoteOutbox>) -> Self {
        Self(outbox)
    }

    fn send(&self, update: MediaSessionUpdate) {
        self.0.push(RemoteMessage::MediaSession { update });
    }
}

impl MediaSessionHost for RemoteMediaSession {
    fn register_actions(&self, actions: &[MediaAction]) {
        self.send(MediaSessionUpdate::RegisterActions {
            actions: actions.to_vec(),
        });
    }

    fn clear_actions(&self) {
        self.send(MediaSessionUpdate::ClearActions);
    }

    fn set_metadata(&self, metadata: Option<MediaMetadata>) {
        self.send(MediaSessionUpdate::Metadata { metadata });
    }

    fn set_playback_state(&self, state: MediaPlaybackState) {
        self.send(MediaSessionUpdate::PlaybackState { state });
    }

    fn set_position_state(&self, state: PositionState) {
        self.send(MediaSessionUpdate::PositionState { state });
    }
}

pub(crate) struct RemoteKeepAlive(Arc<RemoteOutbox>);

impl RemoteKeepAlive {
    pub(crate) fn new(outbox: Arc<RemoteOutbox>) -> Self {
        Self(outbox)
    }

    fn send(&self, command: KeepAliveCommand) {
        self.0.push(RemoteMessage::KeepAlive { command });
    }
}

impl KeepAlive for RemoteKeepAlive {
    fn resume(&self) {
        self.send(KeepAliveCommand::Resume);
    }

    fn suspend(&self) {
        self.send(KeepAliveCommand::Suspend);
    }

    fn teardown(&self) {
        self.send(KeepAliveCommand::Teardown);
    }
}

/// Logs engine notices and forwards them to the page.
pub(crate) struct OutboxListener(Arc<RemoteOutbox>);

impl OutboxListener {
    pub(crate) fn new(outbox: Arc<RemoteOutbox>) -> Self {
        Self(outbox)
    }
}

impl EngineListener for OutboxListener {
    fn notify(&self, notice: EngineNotice) {
        info!(?notice, "Engine notice");
        self.0.push(RemoteMessage::Notice { notice });
    }
}
