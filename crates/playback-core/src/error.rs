/// Failure taxonomy shared by the resolvers and the playback engine.
///
/// None of these escape the engine: it turns each one into a retry, a
/// backend swap or a skip.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackError {
    /// Credentials were rejected. Never retried.
    #[error("Credentials were rejected by the search endpoint")]
    Auth,
    /// Rate limit, server error or network failure. Retried with backoff.
    #[error("Temporary failure: {0}")]
    Transient(String),
    #[error("No acceptable candidate for {0:?}")]
    NotFound(String),
    #[error("Playback failed: {0}")]
    Playback(String),
    /// A single request exceeded its bound.
    #[error("Request timed out")]
    Timeout,
}
