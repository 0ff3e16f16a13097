use crate::http::ControlError;
use crate::remote::SessionCredentials;
use actix_web::web::{Data, Json, Path};
use actix_web::{HttpResponse, Responder};
use playback_core::playback::{PlaybackEngine, PlaybackSnapshot, TrackDescriptor};
use playback_core::TrackId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize)]
struct StateResponse {
    #[serde(flatten)]
    playback: PlaybackSnapshot,
    credentials_configured: bool,
    tracks: Vec<TrackDescriptor>,
}

fn snapshot(engine: &PlaybackEngine) -> HttpResponse {
    HttpResponse::Ok().json(engine.snapshot())
}

pub(crate) async fn get_state(
    engine: Data<Arc<PlaybackEngine>>,
    credentials: Data<Arc<SessionCredentials>>,
) -> impl Responder {
    HttpResponse::Ok().json(StateResponse {
        playback: engine.snapshot(),
        credentials_configured: credentials.is_configured(),
        tracks: engine.tracks(),
    })
}

pub(crate) async fn replace_tracks(
    engine: Data<Arc<PlaybackEngine>>,
    tracks: Json<Vec<TrackDescriptor>>,
) -> impl Responder {
    engine.reset(tracks.into_inner());
    snapshot(&engine)
}

#[derive(Serialize)]
struct ResolveResponse {
    attached: usize,
}

pub(crate) async fn resolve_tracks(
    engine: Data<Arc<PlaybackEngine>>,
) -> Result<HttpResponse, ControlError> {
    let attached = engine.resolve_all().await?;

    Ok(HttpResponse::Ok().json(ResolveResponse { attached }))
}

pub(crate) async fn play_track(
    engine: Data<Arc<PlaybackEngine>>,
    track_id: Path<String>,
) -> Result<HttpResponse, ControlError> {
    let track_id = TrackId::from(track_id.into_inner());
    if !engine.tracks().iter().any(|track| track.id == track_id) {
        return Err(ControlError::UnknownTrack(track_id));
    }

    engine.play_track(&track_id).await;

    Ok(snapshot(&engine))
}

pub(crate) async fn play_all(engine: Data<Arc<PlaybackEngine>>) -> impl Responder {
    engine.play_all().await;
    snapshot(&engine)
}

pub(crate) async fn play(engine: Data<Arc<PlaybackEngine>>) -> impl Responder {
    engine.play().await;
    snapshot(&engine)
}

pub(crate) async fn pause(engine: Data<Arc<PlaybackEngine>>) -> impl Responder {
    engine.pause();
    snapshot(&engine)
}

pub(crate) async fn toggle_play(engine: Data<Arc<PlaybackEngine>>) -> impl Responder {
    engine.toggle_play().await;
    snapshot(&engine)
}

pub(crate) async fn next(engine: Data<Arc<PlaybackEngine>>) -> impl Responder {
    engine.next().await;
    snapshot(&engine)
}

pub(crate) async fn previous(engine: Data<Arc<PlaybackEngine>>) -> impl Responder {
    engine.previous().await;
    snapshot(&engine)
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum SeekRequest {
    To { position: f64 },
    By { delta: f64 },
}

#[derive(Serialize)]
struct SeekResponse {
    position: f64,
}

pub(crate) async fn seek(
    engine: Data<Arc<PlaybackEngine>>,
    request: Json<SeekRequest>,
) -> impl Responder {
    let position = match request.into_inner() {
        SeekRequest::To { position } => engine.seek(position),
        SeekRequest::By { delta } => engine.seek_by(delta),
    };

    HttpResponse::Ok().json(SeekResponse { position })
}

#[derive(Deserialize)]
pub(crate) struct VolumeRequest {
    level: u8,
}

#[derive(Serialize)]
struct VolumeResponse {
    level: u8,
}

pub(crate) async fn set_volume(
    engine: Data<Arc<PlaybackEngine>>,
    request: Json<VolumeRequest>,
) -> impl Responder {
    let level = engine.set_volume(request.level);

    HttpResponse::Ok().json(VolumeResponse { level })
}

/// Without `enabled` the mode is toggled.
#[derive(Deserialize)]
pub(crate) struct ShuffleRequest {
    #[serde(default)]
    enabled: Option<bool>,
}

#[derive(Serialize)]
struct ShuffleResponse {
    shuffle: bool,
}

pub(crate) async fn set_shuffle(
    engine: Data<Arc<PlaybackEngine>>,
    request: Json<ShuffleRequest>,
) -> impl Responder {
    let shuffle = match request.enabled {
        Some(enabled) => {
            engine.set_shuffle(enabled);
            enabled
        }
        None => engine.toggle_shuffle(),
    };

    HttpResponse::Ok().json(ShuffleResponse { shuffle })
}

#[derive(Deserialize)]
pub(crate) struct CredentialsRequest {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Serialize)]
struct CredentialsResponse {
    configured: bool,
}

pub(crate) async fn set_credentials(
    credentials: Data<Arc<SessionCredentials>>,
    request: Json<CredentialsRequest>,
) -> impl Responder {
    let CredentialsRequest {
        api_key,
        access_token,
    } = request.into_inner();
    credentials.update(api_key, access_token);

    HttpResponse::Ok().json(CredentialsResponse {
        configured: credentials.is_configured(),
    })
}
