use crate::api::spotify_api::SpotifyClient;
use crate::db::CredentialStore;
use crate::error::LinkError;
use crate::spotify_oauth::SpotifyOauthEndpoints;
use chrono::Utc;
use tracing::{info, warn};
use url::Url;

/// Hands out provider clients with a usable access token, refreshing first when
/// the stored one has expired.
#[derive(Clone)]
pub struct TokenGate {
    store: CredentialStore,
    oauth: SpotifyOauthEndpoints,
    http: reqwest::Client,
    api_base: Url,
}

impl TokenGate {
    pub fn new(
        store: CredentialStore,
        oauth: SpotifyOauthEndpoints,
        http: reqwest::Client,
        api_base: Url,
    ) -> Self {
        Self {
            store,
            oauth,
            http,
            api_base,
        }
    }

    /// Client authenticated for `user_id`.
    ///
    /// No credential row yields [`LinkError::NotConnected`] without any provider call.
    /// A live token is returned as-is with no write. An expired one triggers exactly
    /// one refresh grant; its failure propagates and is not retried.
    pub async fn get_client(&self, user_id: i64) -> Result<SpotifyClient, LinkError> {
        let cred = self
            .store
            .get_by_user(user_id)
            .await?
            .ok_or(LinkError::NotConnected)?;

        if !cred.is_expired_at(Utc::now()) {
            return Ok(self.client_with(cred.access_token));
        }

        let tokens = self
            .oauth
            .refresh_access_token(&cred.refresh_token, &self.http)
            .await
            .inspect_err(|e| warn!(user_id, error = %e, "spotify token refresh failed"))?;

        if !self.store.update_tokens(user_id, &tokens).await? {
            // Disconnected while refreshing; the token is still valid for this request.
            warn!(user_id, "credential row vanished during refresh");
        }
        info!(user_id, expires_at = %tokens.expires_at, "spotify access token refreshed");
        Ok(self.client_with(tokens.access_token))
    }

    /// Client for a token that did not come from the store (e.g. fresh code exchange).
    pub fn client_with(&self, access_token: String) -> SpotifyClient {
        SpotifyClient::new(self.http.clone(), self.api_base.clone(), access_token)
    }
}
