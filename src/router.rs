use crate::config::{Config, LINK_USER_AGENT};
use crate::db::CredentialStore;
use crate::error::LinkError;
use crate::handlers::{spotify_link, spotify_read};
use crate::service::{SyncQueue, TokenGate};
use crate::spotify_oauth::SpotifyOauthEndpoints;

use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get},
};
use base64::Engine as _;
use rand::RngCore;
use std::time::Instant;
use tracing::{error, info, warn};
use url::Url;

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone)]
pub struct AppState {
    pub store: CredentialStore,
    pub oauth: SpotifyOauthEndpoints,
    pub gate: TokenGate,
    pub sync: SyncQueue,
    pub client: reqwest::Client,
    pub frontend_url: Url,
}

impl AppState {
    pub fn new(cfg: &Config, store: CredentialStore, sync: SyncQueue) -> Result<Self, LinkError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(LINK_USER_AGENT)
            // Token endpoints must not be followed across redirects.
            .redirect(reqwest::redirect::Policy::none());
        if let Some(proxy_url) = cfg.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }
        let client = builder.build()?;

        let oauth = SpotifyOauthEndpoints::from_config(cfg)?;
        let api_base = Url::parse(&cfg.spotify_api_base)?;
        let gate = TokenGate::new(store.clone(), oauth.clone(), client.clone(), api_base);

        Ok(Self {
            store,
            oauth,
            gate,
            sync,
            client,
            frontend_url: Url::parse(&cfg.frontend_url)?,
        })
    }
}

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let start = Instant::now();
    let mut resp = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status();
    let latency_ms = start.elapsed().as_millis() as u64;

    if status.is_server_error() {
        error!(
            "| {:>3} | {} | {:^7} | {} | {}ms",
            status.as_u16(),
            request_id,
            method.as_str(),
            path,
            latency_ms
        );
    } else if status.is_client_error() {
        warn!(
            "| {:>3} | {} | {:^7} | {} | {}ms",
            status.as_u16(),
            request_id,
            method.as_str(),
            path,
            latency_ms
        );
    } else {
        info!(
            "| {:>3} | {} | {:^7} | {} | {}ms",
            status.as_u16(),
            request_id,
            method.as_str(),
            path,
            latency_ms
        );
    }

    resp
}

pub fn spotify_router() -> Router<AppState> {
    Router::new()
        .route("/connect", get(spotify_link::spotify_connect))
        .route("/callback", get(spotify_link::spotify_callback))
        .route("/status", get(spotify_link::spotify_status))
        .route("/disconnect", delete(spotify_link::spotify_disconnect))
        .route("/sync-status", get(spotify_link::spotify_sync_status))
        .route("/playlists", get(spotify_read::spotify_playlists))
        .route("/recently-played", get(spotify_read::spotify_recently_played))
}

pub fn link_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/spotify", spotify_router())
        .fallback(not_found_handler)
        .layer(middleware::from_fn(access_log))
        .with_state(state)
}
