use mimalloc::MiMalloc;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tubify_link::db::CredentialStore;
use tubify_link::router::{AppState, link_router};
use tubify_link::service::{SyncQueue, sync_queue};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &tubify_link::config::CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        proxy = %cfg.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        loglevel = %cfg.loglevel,
        frontend_url = %cfg.frontend_url,
        redirect_uri = %cfg.spotify_redirect_uri
    );

    let store = CredentialStore::connect(&cfg.database_url).await?;

    let (sync, job_rx) = SyncQueue::channel(cfg.sync_concurrency * 16);
    let _worker = sync_queue::spawn_worker(job_rx, store.clone(), cfg.sync_concurrency);

    // Build axum router and serve
    let state = AppState::new(cfg, store, sync)?;
    let app = link_router(state);

    let addr = SocketAddr::new(cfg.listen_addr, cfg.listen_port);
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
