use crate::config::Config;
use async_trait::async_trait;
use media_providers::{AudioStreamInfo, InvidiousClient, MirrorClientError, PipedClient};
use playback_core::resolution::{AudioStream, MirrorError, MirrorFamily, MirrorProvider};
use playback_core::MediaId;
use std::sync::Arc;
use tracing::warn;

struct PipedMirror(PipedClient);

struct InvidiousMirror(InvidiousClient);

impl PipedMirror {
    fn new(client: PipedClient) -> Self {
        Self(client)
    }
}

impl InvidiousMirror {
    fn new(client: InvidiousClient) -> Self {
        Self(client)
    }
}

pub(crate) fn mirror_error(error: MirrorClientError) -> MirrorError {
    match error {
        MirrorClientError::Status(status) => MirrorError::Status(status),
        MirrorClientError::Timeout => MirrorError::Timeout,
        MirrorClientError::Reqwest(error) => MirrorError::Network(error.to_string()),
        MirrorClientError::Parse(error) => MirrorError::Decode(error.to_string()),
    }
}

fn into_audio_streams(streams: Vec<AudioStreamInfo>) -> Vec<AudioStream> {
    streams
        .iter()
        .map(|stream| AudioStream::new(&stream.url, &stream.mime_type, stream.bitrate))
        .collect()
}

#[async_trait]
impl MirrorProvider for PipedMirror {
    fn name(&self) -> &str {
        self.0.instance()
    }

    fn family(&self) -> MirrorFamily {
        MirrorFamily::Primary
    }

    async fn audio_streams(&self, media_id: &MediaId) -> Result<Vec<AudioStream>, MirrorError> {
        self.0
            .audio_streams(media_id)
            .await
            .map(into_audio_streams)
            .map_err(mirror_error)
    }
}

#[async_trait]
impl MirrorProvider for InvidiousMirror {
    fn name(&self) -> &str {
        self.0.instance()
    }

    fn family(&self) -> MirrorFamily {
        MirrorFamily::Secondary
    }

    async fn audio_streams(&self, media_id: &MediaId) -> Result<Vec<AudioStream>, MirrorError> {
        self.0
            .audio_streams(media_id)
            .await
            .map(into_audio_streams)
            .map_err(mirror_error)
    }
}

/// Builds one provider per configured instance. Instances whose client
/// cannot be created are skipped.
pub(crate) fn mirror_providers(config: &Config) -> Vec<Arc<dyn MirrorProvider>> {
    let timeout = config.mirror_timeout();
    let mut providers: Vec<Arc<dyn MirrorProvider>> = Vec::new();

    for instance in config.piped_instances() {
        match PipedClient::create(instance, timeout) {
            Ok(client) => providers.push(Arc::new(PipedMirror::new(client))),
            Err(error) => warn!(instance, ?error, "Unable to create mirror client"),
        }
    }

    for instance in config.invidious_instances() {
        match InvidiousClient::create(instance, timeout) {
            Ok(client) => providers.push(Arc::new(InvidiousMirror::new(client))),
            Err(error) => warn!(instance, ?error, "Unable to create mirror client"),
        }
    }

    providers
}
