use serde::{Deserialize, Deserializer};

/// One audio rendition offered by a mirror, normalized across families.
#[derive(Debug, PartialEq, Clone)]
pub struct AudioStreamInfo {
    pub url: String,
    pub mime_type: String,
    pub bitrate: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipedStreams {
    #[serde(default)]
    audio_streams: Vec<PipedAudioStream>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipedAudioStream {
    #[serde(default)]
    url: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default, deserialize_with = "lenient_bitrate")]
    bitrate: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvidiousVideo {
    #[serde(default)]
    adaptive_formats: Vec<InvidiousFormat>,
}

#[derive(Deserialize)]
struct InvidiousFormat {
    #[serde(default)]
    url: String,
    #[serde(default, rename = "type")]
    mime_type: String,
    #[serde(default, deserialize_with = "lenient_bitrate")]
    bitrate: u64,
}

/// Bitrates come as numbers from one family and as strings from the other.
fn lenient_bitrate<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Bitrate {
        Number(u64),
        Float(f64),
        Text(String),
        Missing(()),
    }

    Ok(match Bitrate::deserialize(deserializer)? {
        Bitrate::Number(value) => value,
        Bitrate::Float(value) if value.is_finite() && value > 0.0 => value as u64,
        Bitrate::Text(text) => text.trim().parse().unwrap_or_default(),
        Bitrate::Float(_) | Bitrate::Missing(()) => 0,
    })
}

pub(crate) fn parse_piped_streams(raw: &str) -> Result<Vec<AudioStreamInfo>, serde_json::Error> {
    let response: PipedStreams = serde_json::from_str(raw)?;

    Ok(response
        .audio_streams
        .into_iter()
        .map(|stream| AudioStreamInfo {
            url: stream.url,
            mime_type: stream.mime_type,
            bitrate: stream.bitrate,
        })
        .collect())
}

/// Video renditions are kept; callers filter on the mime type.
pub(crate) fn parse_invidious_formats(
    raw: &str,
) -> Result<Vec<AudioStreamInfo>, serde_json::Error> {
    let response: InvidiousVideo = serde_json::from_str(raw)?;

    Ok(response
        .adaptive_formats
        .into_iter()
        .map(|format| AudioStreamInfo {
            url: format.url,
            mime_type: format.mime_type,
            bitrate: format.bitrate,
        })
        .collect())
}
