use async_trait::async_trait;
use media_providers::{YouTubeAuth, YouTubeClient, YouTubeClientError};
use playback_core::resolution::{
    Credentials, SearchCandidate, SearchEndpoint, SearchEndpointError,
};

pub(crate) struct YouTubeSearchEndpoint(YouTubeClient);

impl YouTubeSearchEndpoint {
    pub(crate) fn new(client: YouTubeClient) -> Self {
        Self(client)
    }
}

/// An access token wins over an API key when both are present.
pub(crate) fn auth_from(credentials: &Credentials) -> Option<YouTubeAuth<'_>> {
    credentials
        .access_token()
        .map(YouTubeAuth::AccessToken)
        .or_else(|| credentials.api_key().map(YouTubeAuth::ApiKey))
}

pub(crate) fn search_error(error: YouTubeClientError) -> SearchEndpointError {
    match error {
        YouTubeClientError::Unauthorized(status) => SearchEndpointError::Unauthorized(status),
        YouTubeClientError::Unavailable(status) => SearchEndpointError::Unavailable(status),
        YouTubeClientError::Rejected(status) => SearchEndpointError::Rejected(status),
        YouTubeClientError::Timeout => SearchEndpointError::Timeout,
        YouTubeClientError::Reqwest(error) => SearchEndpointError::Network(error.to_string()),
        YouTubeClientError::Parse(error) => {
            SearchEndpointError::Network(format!("malformed search response: {}", error))
        }
    }
}

#[async_trait]
impl SearchEndpoint for YouTubeSearchEndpoint {
    async fn search(
        &self,
        query: &str,
        credentials: &Credentials,
        max_results: usize,
    ) -> Result<Vec<SearchCandidate>, SearchEndpointError> {
        let Some(auth) = auth_from(credentials) else {
            return Err(SearchEndpointError::Unauthorized(401));
        };

        let results = self
            .0
            .search_videos(query, auth, max_results)
            .await
            .map_err(search_error)?;

        Ok(results
            .into_iter()
            .map(|result| {
                SearchCandidate::new(result.video_id, &result.title, &result.channel_title)
            })
            .collect())
    }
}
