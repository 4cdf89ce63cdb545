#![allow(dead_code)]

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::{RawQuery, State},
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower::ServiceExt;
use tubify_link::config::Config;
use tubify_link::db::{CredentialStore, LinkedAccount};
use tubify_link::router::{AppState, link_router};
use tubify_link::service::{SyncJob, SyncQueue};
use tubify_link::spotify_oauth::TokenSet;
use url::Url;

pub const SESSION: &str = "session-alice";
pub const USER_ID: i64 = 1;
/// Access token the mock answers with 502 on read endpoints.
pub const BROKEN_ACCESS: &str = "access-broken";
/// Access token the mock answers slowly on `/v1/me/tracks`.
pub const SLOW_ACCESS: &str = "access-slow";

#[derive(Clone, Default)]
pub struct MockSpotify {
    reqs: Arc<Mutex<Vec<Captured>>>,
}

#[derive(Debug, Clone)]
pub struct Captured {
    pub path: String,
    pub query: Option<String>,
    pub form: HashMap<String, String>,
}

impl MockSpotify {
    fn push(&self, path: &str, query: Option<String>, form: HashMap<String, String>) {
        self.reqs.lock().unwrap().push(Captured {
            path: path.to_string(),
            query,
            form,
        });
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.reqs.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }

    pub fn grants(&self, grant_type: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path == "/token")
            .filter(|r| r.form.get("grant_type").map(String::as_str) == Some(grant_type))
            .count()
    }
}

pub fn unique_sqlite_path(prefix: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "tubify-link-{prefix}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    temp_path
}

async fn spawn_test_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let base = Url::parse(&format!("http://{}", addr)).expect("valid base url");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    base
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string()
}

async fn token_handler(
    State(mock): State<MockSpotify>,
    body: axum::body::Bytes,
) -> (StatusCode, Json<Value>) {
    let form: HashMap<String, String> = url::form_urlencoded::parse(&body).into_owned().collect();
    mock.push("/token", None, form.clone());

    let grant_type = form.get("grant_type").map(String::as_str).unwrap_or("");
    match grant_type {
        "authorization_code" => {
            let code = form.get("code").cloned().unwrap_or_default();
            if code == "bad-code" {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "invalid_grant" })),
                );
            }
            (
                StatusCode::OK,
                Json(json!({
                    "access_token": format!("access-{code}"),
                    "token_type": "Bearer",
                    "expires_in": 3600,
                    "refresh_token": format!("refresh-{code}")
                })),
            )
        }
        "refresh_token" => {
            if form.get("refresh_token").map(String::as_str) == Some("revoked") {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "invalid_grant" })),
                );
            }
            (
                StatusCode::OK,
                Json(json!({
                    "access_token": "access-refreshed",
                    "token_type": "Bearer",
                    "expires_in": 3600
                })),
            )
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "unsupported_grant_type" })),
        ),
    }
}

async fn me_handler(State(mock): State<MockSpotify>) -> Json<Value> {
    mock.push("/v1/me", None, HashMap::new());
    Json(json!({ "id": "spotify-alice", "display_name": "Alice" }))
}

fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, Json(json!({ "error": "upstream down" }))).into_response()
}

async fn playlists_handler(
    State(mock): State<MockSpotify>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    mock.push("/v1/me/playlists", query.clone(), HashMap::new());
    if bearer(&headers) == BROKEN_ACCESS {
        return bad_gateway();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("127.0.0.1")
        .to_string();

    let second_page = query.as_deref().is_some_and(|q| q.contains("offset=2"));
    let page = if second_page {
        Json(json!({
            "items": [{ "id": "pl-3", "name": "Third", "description": "" }],
            "next": null,
            "total": 3
        }))
    } else {
        Json(json!({
            "items": [
                { "id": "pl-1", "name": "First", "description": "one" },
                null,
                { "id": "pl-2", "name": "Second", "description": null }
            ],
            "next": format!("http://{host}/v1/me/playlists?offset=2&limit=50"),
            "total": 3
        }))
    };
    page.into_response()
}

async fn recently_played_handler(
    State(mock): State<MockSpotify>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    mock.push("/v1/me/player/recently-played", query, HashMap::new());
    if bearer(&headers) == BROKEN_ACCESS {
        return bad_gateway();
    }
    Json(json!({
        "items": [
            {
                "track": {
                    "name": "Song A",
                    "artists": [{ "name": "Artist 1" }, { "name": "Artist 2" }],
                    "album": {
                        "name": "Album A",
                        "images": [{ "url": "https://img/a-large" }, { "url": "https://img/a-small" }]
                    },
                    "external_urls": { "spotify": "https://open.spotify.com/track/a" }
                },
                "played_at": "2026-01-02T03:04:05.000Z"
            },
            {
                "track": {
                    "name": "Song B",
                    "artists": [{ "name": "Artist 3" }],
                    "album": { "name": "Album B", "images": [] },
                    "external_urls": {}
                },
                "played_at": "2026-01-02T02:00:00.000Z"
            }
        ],
        "next": null
    }))
    .into_response()
}

async fn tracks_handler(State(mock): State<MockSpotify>, headers: HeaderMap) -> Response {
    mock.push("/v1/me/tracks", None, HashMap::new());
    match bearer(&headers).as_str() {
        "access-forbidden" => {
            return (StatusCode::FORBIDDEN, Json(json!({ "error": "forbidden" }))).into_response();
        }
        SLOW_ACCESS => tokio::time::sleep(std::time::Duration::from_millis(500)).await,
        _ => {}
    }
    Json(json!({ "items": [], "next": null, "total": 123 })).into_response()
}

pub async fn spawn_mock_spotify() -> (MockSpotify, Url) {
    let mock = MockSpotify::default();
    let app = Router::new()
        .route("/token", post(token_handler))
        .route("/v1/me", get(me_handler))
        .route("/v1/me/playlists", get(playlists_handler))
        .route(
            "/v1/me/player/recently-played",
            get(recently_played_handler),
        )
        .route("/v1/me/tracks", get(tracks_handler))
        .with_state(mock.clone());
    let base = spawn_test_server(app).await;
    (mock, base)
}

pub struct Harness {
    pub app: Router,
    pub state: AppState,
    pub store: CredentialStore,
    pub mock: MockSpotify,
    pub job_rx: mpsc::Receiver<SyncJob>,
    db_path: std::path::PathBuf,
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
    }
}

pub async fn harness(prefix: &str) -> Harness {
    let (mock, base) = spawn_mock_spotify().await;

    let db_path = unique_sqlite_path(prefix);
    let store = CredentialStore::connect(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("open store");
    seed_user(&store).await;

    let mut cfg = Config::default();
    cfg.spotify_client_id = "client-id".to_string();
    cfg.spotify_client_secret = "client-secret".to_string();
    cfg.spotify_redirect_uri = "http://localhost:8000/api/spotify/callback".to_string();
    cfg.frontend_url = "http://frontend.test".to_string();
    cfg.spotify_auth_url = base.join("authorize").expect("auth url").to_string();
    cfg.spotify_token_url = base.join("token").expect("token url").to_string();
    cfg.spotify_api_base = base.join("v1").expect("api base").to_string();
    cfg.validate().expect("valid test config");

    // The test keeps the receiving half so queued jobs can be inspected.
    let (sync, job_rx) = SyncQueue::channel(8);
    let state = AppState::new(&cfg, store.clone(), sync).expect("app state");
    let app = link_router(state.clone());

    Harness {
        app,
        state,
        store,
        mock,
        job_rx,
        db_path,
    }
}

async fn seed_user(store: &CredentialStore) {
    sqlx::query("INSERT INTO users (id, username) VALUES (?, 'alice')")
        .bind(USER_ID)
        .execute(store.pool())
        .await
        .expect("insert user");
    sqlx::query("INSERT INTO user_sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
        .bind(SESSION)
        .bind(USER_ID)
        .bind((Utc::now() + Duration::hours(1)).to_rfc3339())
        .execute(store.pool())
        .await
        .expect("insert session");
}

/// Store a credential directly, bypassing the OAuth callback.
pub async fn link_directly(store: &CredentialStore, access: &str, refresh: &str, ttl: Duration) {
    store
        .upsert_linked(LinkedAccount {
            user_id: USER_ID,
            spotify_id: "spotify-alice".to_string(),
            tokens: TokenSet {
                access_token: access.to_string(),
                refresh_token: refresh.to_string(),
                expires_at: Utc::now() + ttl,
            },
        })
        .await
        .expect("seed credential");
}

pub async fn send(app: &Router, method: &str, uri: &str, session: Option<&str>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = session {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).expect("failed to build request"))
        .await
        .expect("request failed")
}

pub async fn json_body(resp: Response) -> Value {
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&body).expect("response body was not json")
}

/// Query pairs of the redirect `Location`.
pub fn redirect_query(resp: &Response) -> HashMap<String, String> {
    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("redirect without location");
    let url = Url::parse(location).expect("location was not a url");
    assert_eq!(url.host_str(), Some("frontend.test"));
    url.query_pairs().into_owned().collect()
}
