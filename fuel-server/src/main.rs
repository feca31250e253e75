use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fuel_server::backend::{BackendClient, BackendConfig};
use fuel_server::cache::{CacheConfig, CachedBackend};
use fuel_server::config::ServerConfig;
use fuel_server::listing::ListingConfig;
use fuel_server::stations::{StationCache, StationCacheConfig, StationDirectory};
use fuel_server::web::{AppState, create_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fuel_server=info,tower_http=info")),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let backend_config = BackendConfig::new(&config.backend_url, &config.anon_key);
    let client = BackendClient::new(backend_config).expect("Failed to create backend client");

    let cached = CachedBackend::new(client.clone(), &CacheConfig::default());

    // Load stations (fail fast if neither the backend nor a snapshot has them)
    info!("fetching station directory");
    let station_cache = StationCache::new(StationCacheConfig::new(&config.station_cache_path));
    let stations = StationDirectory::fetch(client, Some(station_cache))
        .await
        .expect("Failed to load stations");
    info!(count = stations.len().await, "loaded stations");

    // Refresh the directory in the background
    let refresh = stations.clone();
    let refresh_every = config.station_refresh;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(refresh_every);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            if let Err(e) = refresh.refresh().await {
                warn!(error = %e, "failed to refresh stations");
            }
        }
    });

    let state = AppState::new(cached, stations, ListingConfig::default());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listen address");
    info!("fuel price server listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    info!("server shut down");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
