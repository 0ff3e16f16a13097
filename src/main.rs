use crate::app::AppServices;
use crate::config::Config;
use crate::impls::{mirror_providers, YouTubeSearchEndpoint};
use crate::remote::SessionCredentials;
use actix_rt::signal::unix;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use futures_lite::FutureExt;
use media_providers::YouTubeClient;
use playback_core::resolution::{StreamResolver, TrackResolver};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

mod app;
mod config;
mod http;
mod impls;
mod remote;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const PROGRESS_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    let mut terminate = unix::signal(unix::SignalKind::terminate())?;
    let mut interrupt = unix::signal(unix::SignalKind::interrupt())?;

    dotenv::dotenv().ok();
    env_logger::init();

    let config = Arc::from(Config::from_env());

    info!(version = VERSION, "Starting application...");

    let search_client =
        YouTubeClient::create(&config.youtube_api_endpoint, config.search_timeout())
            .expect("Unable to initialize search client");
    let mirrors = mirror_providers(&config);
    if mirrors.is_empty() {
        warn!("No stream mirrors configured, every track will use the embedded player");
    }

    let credentials = SessionCredentials::new(config.youtube_api_key.clone());
    if !credentials.is_configured() {
        warn!("No search API key configured, waiting for credentials from the page");
    }

    let services = AppServices::build(
        config.engine_config(),
        TrackResolver::new(
            Arc::new(YouTubeSearchEndpoint::new(search_client)),
            config.track_resolver_config(),
        ),
        StreamResolver::new(mirrors, config.stream_resolver_config()),
        credentials,
    );

    let progress_poller = actix_rt::spawn({
        let engine = Arc::clone(&services.engine);

        async move {
            let mut interval = tokio::time::interval(PROGRESS_POLL_INTERVAL);
            loop {
                interval.tick().await;
                engine.progress();
            }
        }
    });

    let shutdown_timeout = config.shutdown_timeout;
    let bind_address = config.bind_address.clone();

    let server = HttpServer::new({
        let engine = Arc::clone(&services.engine);
        let bridge = Arc::clone(&services.bridge);
        let credentials = Arc::clone(&services.credentials);

        move || {
            App::new()
                .app_data(Data::new(Arc::clone(&engine)))
                .app_data(Data::new(Arc::clone(&bridge)))
                .app_data(Data::new(Arc::clone(&credentials)))
                .configure(http::routes)
        }
    })
    .shutdown_timeout(shutdown_timeout)
    .bind(bind_address)?
    .run();

    let server_handle = server.handle();

    actix_rt::spawn({
        async move {
            if let Err(error) = server.await {
                error!(?error, "Error on http server");
            }
        }
    });

    info!("Application started");

    interrupt.recv().or(terminate.recv()).await;

    info!("Received shutdown signal. Shutting down gracefully...");

    server_handle.stop(true).await;
    progress_poller.abort();
    services.engine.dispose();

    Ok(())
}
