use crate::resolution::types::{AudioStream, Credentials, MirrorFamily, SearchCandidate};
use crate::MediaId;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum SearchEndpointError {
    #[error("Search request was not authorized (status {0})")]
    Unauthorized(u16),
    #[error("Search endpoint is rate limited or failing (status {0})")]
    Unavailable(u16),
    #[error("Search request timed out")]
    Timeout,
    #[error("Search request failed: {0}")]
    Network(String),
    #[error("Search request was rejected (status {0})")]
    Rejected(u16),
}

#[async_trait]
pub trait SearchEndpoint: Send + Sync {
    async fn search(
        &self,
        query: &str,
        credentials: &Credentials,
        max_results: usize,
    ) -> Result<Vec<SearchCandidate>, SearchEndpointError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("Mirror responded with status {0}")]
    Status(u16),
    #[error("Mirror request timed out")]
    Timeout,
    #[error("Mirror request failed: {0}")]
    Network(String),
    #[error("Unable to decode mirror response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait MirrorProvider: Send + Sync {
    fn name(&self) -> &str;

    fn family(&self) -> MirrorFamily;

    async fn audio_streams(&self, media_id: &MediaId) -> Result<Vec<AudioStream>, MirrorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Search credentials are not configured")]
    NotConfigured,
    #[error("Unable to obtain credentials: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self) -> Result<Credentials, CredentialError>;

    /// Called after the search endpoint rejected the last credentials.
    fn invalidate(&self) {}
}
