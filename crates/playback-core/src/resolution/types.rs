use crate::MediaId;
use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Debug)]
pub struct SearchCandidate {
    pub media_id: MediaId,
    pub title: String,
    pub channel: String,
}

impl SearchCandidate {
    pub fn new(media_id: impl Into<MediaId>, title: &str, channel: &str) -> Self {
        Self {
            media_id: media_id.into(),
            title: title.to_string(),
            channel: channel.to_string(),
        }
    }
}

/// Search credentials: an API key, an OAuth access token, or both.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Credentials {
    api_key: Option<String>,
    access_token: Option<String>,
}

impl Credentials {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            access_token: None,
        }
    }

    pub fn with_access_token(access_token: impl Into<String>) -> Self {
        Self {
            api_key: None,
            access_token: Some(access_token.into()),
        }
    }

    pub fn and_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token.replace(access_token.into());
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

/// Mirror families differ only in their response schema.
#[derive(Eq, PartialEq, Clone, Copy, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorFamily {
    /// Family A. Several endpoints are raced per attempt.
    Primary,
    /// Family B. At least one endpoint joins every race.
    Secondary,
}

#[derive(Clone, PartialEq, Debug)]
pub struct AudioStream {
    pub url: String,
    pub mime_type: String,
    pub bitrate: u64,
}

impl AudioStream {
    pub fn new(url: &str, mime_type: &str, bitrate: u64) -> Self {
        Self {
            url: url.to_string(),
            mime_type: mime_type.to_string(),
            bitrate,
        }
    }

    /// mp4/m4a audio plays in every native element; webm/opus does not.
    pub fn is_broadly_compatible(&self) -> bool {
        self.mime_type.contains("mp4") || self.mime_type.contains("m4a")
    }

    fn is_audio(&self) -> bool {
        !self.url.is_empty() && self.mime_type.starts_with("audio/")
    }
}

/// Picks the most compatible audio stream, falling back to the highest bitrate.
pub fn select_audio_stream(mut streams: Vec<AudioStream>) -> Option<AudioStream> {
    streams.retain(AudioStream::is_audio);
    streams.sort_by(|a, b| b.bitrate.cmp(&a.bitrate));

    match streams.iter().position(AudioStream::is_broadly_compatible) {
        Some(index) => Some(streams.swap_remove(index)),
        None => streams.into_iter().next(),
    }
}
