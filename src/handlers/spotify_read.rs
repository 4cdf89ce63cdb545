use crate::api::spotify_api::MAX_PAGE_LIMIT;
use crate::middleware::auth::CurrentUser;
use crate::types::spotify::{PlaylistSummary, RecentlyPlayedItem, RecentlyPlayedList};
use crate::{LinkError, router::AppState};
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RecentlyPlayedQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    MAX_PAGE_LIMIT
}

/// GET /api/spotify/playlists -> every playlist, flagged if already imported.
pub async fn spotify_playlists(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<PlaylistSummary>>, LinkError> {
    let client = state.gate.get_client(user.id).await?;

    let playlists = client
        .playlists()
        .await
        .map_err(|e| LinkError::provider("failed to fetch spotify playlists", e))?;
    let imported = state.store.imported_playlist_ids(user.id).await?;

    let summaries = playlists
        .into_iter()
        .map(|p| PlaylistSummary {
            is_imported: imported.contains(&p.id),
            id: p.id,
            name: p.name,
            description: p.description,
        })
        .collect();
    Ok(Json(summaries))
}

/// GET /api/spotify/recently-played?limit=50
pub async fn spotify_recently_played(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    query: Result<Query<RecentlyPlayedQuery>, QueryRejection>,
) -> Result<Json<RecentlyPlayedList>, LinkError> {
    let Query(query) = query.map_err(|e| LinkError::InvalidQuery(e.body_text()))?;
    let client = state.gate.get_client(user.id).await?;

    let history = client
        .recently_played(query.limit)
        .await
        .map_err(|e| LinkError::provider("failed to fetch recently played", e))?;

    Ok(Json(RecentlyPlayedList {
        recently_played: history
            .items
            .into_iter()
            .map(RecentlyPlayedItem::from)
            .collect(),
    }))
}
