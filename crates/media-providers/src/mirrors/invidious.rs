use crate::build_http_client;
use crate::mirrors::parser::{parse_invidious_formats, AudioStreamInfo};
use crate::mirrors::{fetch_json_text, MirrorClientError};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Client of a single Invidious instance.
pub struct InvidiousClient {
    client: Client,
    instance: String,
}

impl InvidiousClient {
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
        let raw_json = fetch_json_text(
            &self.client,
            format!("{}/api/v1/videos/{}", self.instance, video_id),
        )
        .await?;
        let formats = parse_invidious_formats(&raw_json)?;

        debug!(instance = %self.instance, video_id, formats = formats.len(), "Invidious formats fetched");

        Ok(formats)
    }
}
