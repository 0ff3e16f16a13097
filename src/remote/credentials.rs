use async_trait::async_trait;
use playback_core::resolution::{CredentialError, CredentialProvider, Credentials};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

#[derive(Default)]
struct StoredCredentials {
    api_key: Option<String>,
    access_token: Option<String>,
}

/// Search credentials for the running session. Starts from the configured
/// API key; the page may supply an access token or a replacement key.
pub(crate) struct SessionCredentials {
    stored: Mutex<StoredCredentials>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl SessionCredentials {
    pub(crate) fn new(api_key: Option<String>) -> Self {
        Self {
            stored: Mutex::new(StoredCredentials {
                api_key: non_blank(api_key),
                access_token: None,
            }),
        }
    }

    /// Replaces the fields that are present. Blank values clear the field.
    pub(crate) fn update(&self, api_key: Option<String>, access_token: Option<String>) {
        let mut stored = self.lock();

        if let Some(api_key) = api_key {
            stored.api_key = non_blank(Some(api_key));
        }
        if let Some(access_token) = access_token {
            stored.access_token = non_blank(Some(access_token));
        }

        info!(
            api_key = stored.api_key.is_some(),
            access_token = stored.access_token.is_some(),
            "Search credentials updated"
        );
    }

    pub(crate) fn is_configured(&self) -> bool {
        let stored = self.lock();
        stored.api_key.is_some() || stored.access_token.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, StoredCredentials> {
        self.stored.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CredentialProvider for SessionCredentials {
    async fn credentials(&self) -> Result<Credentials, CredentialError> {
        let stored = self.lock();

        match (&stored.api_key, &stored.access_token) {
            (Some(api_key), Some(access_token)) => {
                Ok(Credentials::with_api_key(api_key).and_access_token(access_token))
            }
            (Some(api_key), None) => Ok(Credentials::with_api_key(api_key)),
            (None, Some(access_token)) => Ok(Credentials::with_access_token(access_token)),
            (None, None) => Err(CredentialError::NotConfigured),
        }
    }

    /// Searches use the access token when there is one, so that is what got
    /// rejected. Otherwise the API key did.
    fn invalidate(&self) {
        let mut stored = self.lock();

        if stored.access_token.take().is_some() {
            warn!("Access token rejected, cleared");
        } else if stored.api_key.take().is_some() {
            warn!("API key rejected, cleared");
        }
    }
}
