use crate::build_http_client;
use crate::mirrors::parser::{parse_piped_streams, AudioStreamInfo};
use crate::mirrors::{fetch_json_text, MirrorClientError};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Client of a single Piped API instance.
pub struct PipedClient {
    client: Client,
    instance: String,
}

impl PipedClient {
    pub fn create(instance: &str, timeout: Duration) -> Result<Self, MirrorClientError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            instance: instance.trim_end_matches('/').to_string(),
        })
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub async fn audio_streams(
        &self,
        video_id: &str,
    ) -> Result<Vec<AudioStreamInfo>, MirrorClientError> {
        let raw_json =
            fetch_json_text(&self.client, format!("{}/streams/{}", self.instance, video_id))
                .await?;
        let streams = parse_piped_streams(&raw_json)?;

        debug!(instance = %self.instance, video_id, streams = streams.len(), "Piped streams fetched");

        Ok(streams)
    }
}
