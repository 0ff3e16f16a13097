use crate::remote::SessionCredentials;
use actix_web::web::Data;
use actix_web::{HttpResponse, Responder};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

#[derive(Serialize)]
struct Readiness {
    credentials_configured: bool,
}

pub(crate) async fn readiness_check(credentials: Data<Arc<SessionCredentials>>) -> impl Responder {
    let credentials_configured = credentials.is_configured();
    if !credentials_configured {
        warn!("Readiness check: search credentials are not configured");
    }

    HttpResponse::Ok().json(Readiness {
        credentials_configured,
    })
}
