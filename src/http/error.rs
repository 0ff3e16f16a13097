use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use playback_core::resolution::CredentialError;
use playback_core::TrackId;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ControlError {
    #[error("Track {0} is not in the list")]
    UnknownTrack(TrackId),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for ControlError {
    fn status_code(&self) -> StatusCode {
        match self {
            ControlError::UnknownTrack(_) => StatusCode::NOT_FOUND,
            ControlError::Credentials(CredentialError::NotConfigured) => {
                StatusCode::PRECONDITION_FAILED
            }
            ControlError::Credentials(CredentialError::Unavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
