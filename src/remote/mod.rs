mod backend;
mod credentials;
mod host;
mod outbox;

pub(crate) use backend::RemoteBackend;
pub(crate) use credentials::SessionCredentials;
pub(crate) use host::{OutboxListener, RemoteKeepAlive, RemoteMediaSession};
pub(crate) use outbox::RemoteOutbox;

use playback_core::playback::BackendKind;
use std::sync::Arc;

/// Everything the page-facing endpoints need: the outbox it drains and the
/// two backends it reports for.
pub(crate) struct RemoteBridge {
    pub(crate) outbox: Arc<RemoteOutbox>,
    pub(crate) native: Arc<RemoteBackend>,
    pub(crate) fallback: Arc<RemoteBackend>,
}

impl RemoteBridge {
    pub(crate) fn new(outbox: Arc<RemoteOutbox>) -> Self {
        Self {
            native: Arc::new(RemoteBackend::new(BackendKind::Native, outbox.clone())),
            fallback: Arc::new(RemoteBackend::new(BackendKind::Fallback, outbox.clone())),
            outbox,
        }
    }

    pub(crate) fn backend(&self, kind: BackendKind) -> &Arc<RemoteBackend> {
        match kind {
            BackendKind::Native => &self.native,
            BackendKind::Fallback => &self.fallback,
        }
    }
}

#[cfg(test)]
mod tests;
