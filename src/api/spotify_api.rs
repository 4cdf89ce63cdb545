use crate::error::LinkError;
use crate::types::spotify::{Page, RecentlyPlayedResponse, SimplePlaylist, SpotifyUser};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

/// Spotify caps page sizes at 50 for the endpoints used here.
pub const MAX_PAGE_LIMIT: u32 = 50;

/// Web API client bound to one user's access token.
#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    api_base: Url,
    access_token: String,
}

impl SpotifyClient {
    pub fn new(http: reqwest::Client, api_base: Url, access_token: impl Into<String>) -> Self {
        Self {
            http,
            api_base,
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// `GET /me`
    pub async fn current_user(&self) -> Result<SpotifyUser, LinkError> {
        let url = self.endpoint("me")?;
        self.get_json(url).await
    }

    /// Every playlist of the current user, following `next` until it is absent.
    pub async fn playlists(&self) -> Result<Vec<SimplePlaylist>, LinkError> {
        let mut url = self.endpoint("me/playlists")?;
        url.query_pairs_mut()
            .append_pair("limit", &MAX_PAGE_LIMIT.to_string());

        let mut playlists = Vec::new();
        let mut next = Some(url);
        while let Some(page_url) = next.take() {
            let page: Page<SimplePlaylist> = self.get_json(page_url).await?;
            playlists.extend(page.items.into_iter().flatten());
            next = page.next.as_deref().map(Url::parse).transpose()?;
        }
        debug!(count = playlists.len(), "fetched spotify playlists");
        Ok(playlists)
    }

    /// `GET /me/player/recently-played?limit=N`
    pub async fn recently_played(&self, limit: u32) -> Result<RecentlyPlayedResponse, LinkError> {
        let mut url = self.endpoint("me/player/recently-played")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.clamp(1, MAX_PAGE_LIMIT).to_string());
        self.get_json(url).await
    }

    /// Size of the user's saved-tracks library.
    pub async fn saved_tracks_total(&self) -> Result<i64, LinkError> {
        let mut url = self.endpoint("me/tracks")?;
        url.query_pairs_mut().append_pair("limit", "1");
        let page: Page<serde_json::Value> = self.get_json(url).await?;
        Ok(page.total.unwrap_or(0))
    }

    fn endpoint(&self, path: &str) -> Result<Url, LinkError> {
        // Url::join drops the last segment unless the base ends with '/'.
        let base = format!("{}/", self.api_base.as_str().trim_end_matches('/'));
        Ok(Url::parse(&base)?.join(path)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, LinkError> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(LinkError::UpstreamStatus(resp.status()));
        }
        Ok(resp.json().await?)
    }
}
