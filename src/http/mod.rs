mod bridge;
mod controls;
mod error;
mod health;

pub(crate) use error::ControlError;

use actix_web::web;

pub(crate) fn routes(config: &mut web::ServiceConfig) {
    config
        .service(web::resource("/health").route(web::get().to(health::readiness_check)))
        .service(web::resource("/state").route(web::get().to(controls::get_state)))
        .service(web::resource("/tracks").route(web::put().to(controls::replace_tracks)))
        .service(web::resource("/tracks/resolve").route(web::post().to(controls::resolve_tracks)))
        .service(
            web::resource("/tracks/{track_id}/play").route(web::post().to(controls::play_track)),
        )
        .service(web::resource("/play-all").route(web::post().to(controls::play_all)))
        .service(web::resource("/play").route(web::post().to(controls::play)))
        .service(web::resource("/pause").route(web::post().to(controls::pause)))
        .service(web::resource("/toggle").route(web::post().to(controls::toggle_play)))
        .service(web::resource("/next").route(web::post().to(controls::next)))
        .service(web::resource("/previous").route(web::post().to(controls::previous)))
        .service(web::resource("/seek").route(web::post().to(controls::seek)))
        .service(web::resource("/volume").route(web::post().to(controls::set_volume)))
        .service(web::resource("/shuffle").route(web::post().to(controls::set_shuffle)))
        .service(web::resource("/credentials").route(web::post().to(controls::set_credentials)))
        .service(web::resource("/outbox").route(web::get().to(bridge::drain_outbox)))
        .service(web::resource("/events").route(web::post().to(bridge::report_event)))
        .service(web::resource("/media-actions").route(web::post().to(bridge::media_action)))
        .service(web::resource("/visibility").route(web::post().to(bridge::visibility_change)));
}
