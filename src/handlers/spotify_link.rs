use crate::db::{LinkedAccount, SyncStatus};
use crate::middleware::auth::CurrentUser;
use crate::service::SyncJob;
use crate::{LinkError, router::AppState};
use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use oauth2::AuthorizationCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub struct SpotifyCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub is_connected: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    pub sync_status: SyncStatus,
    pub sync_count: i64,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// GET /api/spotify/connect -> consent URL with the user id as `state`.
pub async fn spotify_connect(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ConnectResponse>, LinkError> {
    if state.store.exists(user.id).await? {
        return Err(LinkError::AlreadyConnected);
    }

    let url = state.oauth.authorize_url(&user.id.to_string());
    info!(user_id = user.id, "issued spotify authorize url");
    Ok(Json(ConnectResponse { url: url.into() }))
}

/// GET /api/spotify/callback -> exchanges the code, stores tokens, bounces to the frontend.
pub async fn spotify_callback(
    State(state): State<AppState>,
    Query(query): Query<SpotifyCallbackQuery>,
) -> Response {
    if let Some(provider_error) = query.error.as_deref() {
        warn!(error = provider_error, "spotify denied authorization");
        return frontend_redirect(&state, "spotify_error", provider_error);
    }

    let user_id = match parse_state(query.state.as_deref()) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };
    let Some(code) = query.code else {
        return LinkError::MissingCode.into_response();
    };

    match link_account(&state, user_id, code).await {
        Ok(()) => frontend_redirect(&state, "spotify_connected", "true"),
        Err(err) => {
            error!(user_id, error = %err, "spotify link failed");
            frontend_redirect(&state, "spotify_error", &err.to_string())
        }
    }
}

/// The state token is the decimal user id handed out by `spotify_connect`.
fn parse_state(raw: Option<&str>) -> Result<i64, LinkError> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or(LinkError::InvalidState)
}

async fn link_account(state: &AppState, user_id: i64, code: String) -> Result<(), LinkError> {
    let tokens = state
        .oauth
        .exchange_code(AuthorizationCode::new(code), &state.client)
        .await?;

    let client = state.gate.client_with(tokens.access_token.clone());
    let spotify_user = client.current_user().await?;

    let account = LinkedAccount {
        user_id,
        spotify_id: spotify_user.id.clone(),
        tokens,
    };
    // A failed write must not keep the browser from getting back to the frontend.
    if let Err(e) = state.store.upsert_linked(account).await {
        error!(user_id, error = %e, "storing spotify credential failed");
        return Ok(());
    }
    info!(user_id, spotify_id = %spotify_user.id, "spotify account linked");

    state.sync.submit(SyncJob { user_id, client });
    Ok(())
}

fn frontend_redirect(state: &AppState, key: &str, value: &str) -> Response {
    let mut url = state.frontend_url.clone();
    url.query_pairs_mut().append_pair(key, value);
    Redirect::temporary(url.as_str()).into_response()
}

/// GET /api/spotify/status
pub async fn spotify_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<StatusResponse>, LinkError> {
    let is_connected = state.store.exists(user.id).await?;
    Ok(Json(StatusResponse { is_connected }))
}

/// DELETE /api/spotify/disconnect -> idempotent.
pub async fn spotify_disconnect(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MessageResponse>, LinkError> {
    let removed = state.store.delete_by_user(user.id).await?;
    info!(user_id = user.id, removed, "spotify disconnected");
    Ok(Json(MessageResponse {
        message: "spotify disconnected successfully",
    }))
}

/// GET /api/spotify/sync-status
pub async fn spotify_sync_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<SyncStatusResponse>, LinkError> {
    let cred = state
        .store
        .get_by_user(user.id)
        .await?
        .ok_or(LinkError::NotConnected)?;
    Ok(Json(SyncStatusResponse {
        sync_status: cred.sync_status,
        sync_count: cred.sync_count,
        last_synced_at: cred.last_synced_at,
    }))
}
