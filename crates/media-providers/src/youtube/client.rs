use crate::build_http_client;
use crate::youtube::parser::{parse_search_response, VideoSearchResult};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Music category of the video platform.
const MUSIC_CATEGORY_ID: &str = "10";

#[derive(Debug, Clone, Copy)]
pub enum YouTubeAuth<'a> {
    ApiKey(&'a str),
    AccessToken(&'a str),
}

#[derive(Debug, thiserror::Error)]
pub enum YouTubeClientError {
    #[error("Search request unauthorized (status {0})")]
    Unauthorized(u16),
    #[error("Search temporarily unavailable (status {0})")]
    Unavailable(u16),
    #[error("Search request rejected (status {0})")]
    Rejected(u16),
    #[error("Search request timed out")]
    Timeout,
    #[error(transparent)]
    Reqwest(reqwest::Error),
    #[error(transparent)]
    Parse(#[from] serde_json::Error),
}

impl From<reqwest::Error> for YouTubeClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            YouTubeClientError::Timeout
        } else {
            YouTubeClientError::Reqwest(error)
        }
    }
}

/// Maps a non-success status to its error kind.
pub(crate) fn status_error(status: StatusCode) -> Option<YouTubeClientError> {
    let code = status.as_u16();

    match status {
        status if status.is_success() => None,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Some(YouTubeClientError::Unauthorized(code))
        }
        StatusCode::TOO_MANY_REQUESTS => Some(YouTubeClientError::Unavailable(code)),
        status if status.is_server_error() => Some(YouTubeClientError::Unavailable(code)),
        _ => Some(YouTubeClientError::Rejected(code)),
    }
}

pub struct YouTubeClient {
    client: Client,
    endpoint: String,
}

impl YouTubeClient {
    pub fn create(endpoint: &str, timeout: Duration) -> Result<Self, YouTubeClientError> {
        let client = build_http_client(timeout)?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub async fn search_videos(
        &self,
        query: &str,
        auth: YouTubeAuth<'_>,
        max_results: usize,
    ) -> Result<Vec<VideoSearchResult>, YouTubeClientError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Query<'a> {
            part: &'a str,
            q: &'a str,
            max_results: usize,
            #[serde(rename = "type")]
            kind: &'a str,
            video_category_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            key: Option<&'a str>,
        }

        let query = Query {
            part: "snippet",
            q: query,
            max_results,
            kind: "video",
            video_category_id: MUSIC_CATEGORY_ID,
            key: match auth {
                YouTubeAuth::ApiKey(key) => Some(key),
                YouTubeAuth::AccessToken(_) => None,
            },
        };

        let mut request = self
            .client
            .get(format!("{}/search", self.endpoint))
            .query(&query);
        if let YouTubeAuth::AccessToken(token) = auth {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if let Some(error) = status_error(response.status()) {
            debug!(status = response.status().as_u16(), "Search request failed");
            return Err(error);
        }

        let raw_json = response.text().await?;

        Ok(parse_search_response(&raw_json)?)
    }
}
