mod mirrors;
mod youtube;

pub use mirrors::*;
pub use youtube::*;

use std::time::Duration;

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}
