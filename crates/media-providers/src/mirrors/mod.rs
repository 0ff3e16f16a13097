mod invidious;
mod parser;
mod piped;

pub use invidious::*;
pub use parser::*;
pub use piped::*;


#[derive(Debug, thiserror::Error)]
pub enum MirrorClientError {
    #[error("Mirror responded with status {0}")]
    Status(u16),
    #[error("Mirror request timed out")]
    Timeout,
    #[error(transparent)]
    Reqwest(reqwest::Error),
    #[error(transparent)]
    Parse(#[from] serde_json::Error),
}

impl From<reqwest::Error> for MirrorClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            MirrorClientError::Timeout
        } else {
            MirrorClientError::Reqwest(error)
        }
    }
}

async fn fetch_json_text(
    client: &reqwest::Client,
    url: String,
) -> Result<String, MirrorClientError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(MirrorClientError::Status(status.as_u16()));
    }

    Ok(response.text().await?)
}
