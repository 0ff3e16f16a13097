use crate::remote::RemoteBridge;
use actix_web::web::{Data, Json};
use actix_web::{HttpResponse, Responder};
use playback_core::playback::{
    BackendEvent, BackendKind, MediaAction, PlaybackEngine, PlaybackToken, Progress,
};
use serde::Deserialize;
use std::sync::Arc;

pub(crate) async fn drain_outbox(bridge: Data<Arc<RemoteBridge>>) -> impl Responder {
    HttpResponse::Ok().json(bridge.outbox.drain())
}

#[derive(Deserialize)]
pub(crate) struct EventReport {
    backend: BackendKind,
    token: PlaybackToken,
    event: BackendEvent,
}

pub(crate) async fn report_event(
    engine: Data<Arc<PlaybackEngine>>,
    bridge: Data<Arc<RemoteBridge>>,
    report: Json<EventReport>,
) -> impl Responder {
    let EventReport {
        backend,
        token,
        event,
    } = report.into_inner();

    match (backend, event) {
        // The embedded player is polled; its time updates only refresh the
        // stored progress.
        (BackendKind::Fallback, BackendEvent::TimeUpdate { position, duration }) => {
            bridge
                .backend(backend)
                .report_progress(token, Progress { position, duration });
        }
        (backend, event) => engine.handle_backend_event(backend, token, event).await,
    }

    HttpResponse::NoContent().finish()
}

#[derive(Deserialize)]
pub(crate) struct MediaActionRequest {
    action: MediaAction,
}

pub(crate) async fn media_action(
    engine: Data<Arc<PlaybackEngine>>,
    request: Json<MediaActionRequest>,
) -> impl Responder {
    engine.handle_media_action(request.action).await;

    HttpResponse::NoContent().finish()
}

#[derive(Deserialize)]
pub(crate) struct VisibilityRequest {
    hidden: bool,
}

pub(crate) async fn visibility_change(
    engine: Data<Arc<PlaybackEngine>>,
    request: Json<VisibilityRequest>,
) -> impl Responder {
    engine.on_visibility_change(request.hidden);

    HttpResponse::NoContent().finish()
}
