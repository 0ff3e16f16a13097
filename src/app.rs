use crate::remote::{
    OutboxListener, RemoteBridge, RemoteKeepAlive, RemoteMediaSession, RemoteOutbox,
    SessionCredentials,
};
use playback_core::playback::{EngineConfig, EngineDependencies, PlaybackEngine, TrackList};
use playback_core::resolution::{StreamResolver, TrackResolver};
use std::sync::Arc;

/// The engine wired to the page bridge, shared by every HTTP worker.
pub(crate) struct AppServices {
    pub(crate) engine: Arc<PlaybackEngine>,
    pub(crate) bridge: Arc<RemoteBridge>,
    pub(crate) credentials: Arc<SessionCredentials>,
}

impl AppServices {
    pub(crate) fn build(
        engine_config: EngineConfig,
        track_resolver: TrackResolver,
        stream_resolver: StreamResolver,
        credentials: SessionCredentials,
    ) -> Self {
        let outbox = Arc::new(RemoteOutbox::default());
        let bridge = Arc::new(RemoteBridge::new(outbox.clone()));
        let credentials = Arc::new(credentials);

        let engine = PlaybackEngine::new(
            engine_config,
            EngineDependencies {
                track_resolver: Arc::new(track_resolver),
                stream_resolver: Arc::new(stream_resolver),
                credentials: credentials.clone(),
                native: bridge.native.clone(),
                fallback: bridge.fallback.clone(),
                media_session: Some(Arc::new(RemoteMediaSession::new(outbox.clone()))),
                keep_alive: Arc::new(RemoteKeepAlive::new(outbox.clone())),
                listener: Arc::new(OutboxListener::new(outbox)),
            },
            TrackList::default(),
        );

        Self {
            engine: Arc::new(engine),
            bridge,
            credentials,
        }
    }
}
