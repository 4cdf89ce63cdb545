use crate::config::Config;
use crate::error::LinkError;
use crate::spotify_oauth::token::{SpotifyTokenResponse, TokenSet};

use oauth2::{
    AuthUrl, AuthorizationCode, Client as OAuth2Client, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, RedirectUrl, RefreshToken, Scope, StandardRevocableToken,
    TokenUrl,
    basic::{BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse},
};
use tracing::info;
use url::Url;

/// Permissions requested on every authorize redirect.
pub const SPOTIFY_SCOPES: [&str; 11] = [
    "user-read-private",
    "user-read-email",
    "user-top-read",
    "playlist-modify-public",
    "playlist-modify-private",
    "user-follow-read",
    "user-library-read",
    "user-library-modify",
    "user-read-currently-playing",
    "user-read-playback-state",
    "user-read-recently-played",
];

/// Spotify OAuth endpoints.
///
/// Holds only static app settings. Every grant builds its own OAuth2 client, so no
/// token ever outlives the request that obtained it or crosses between users.
#[derive(Clone)]
pub struct SpotifyOauthEndpoints {
    client_id: String,
    client_secret: String,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    redirect_url: RedirectUrl,
}

impl SpotifyOauthEndpoints {
    pub fn from_config(cfg: &Config) -> Result<Self, LinkError> {
        Ok(Self {
            client_id: cfg.spotify_client_id.clone(),
            client_secret: cfg.spotify_client_secret.clone(),
            auth_url: AuthUrl::new(cfg.spotify_auth_url.clone())?,
            token_url: TokenUrl::new(cfg.spotify_token_url.clone())?,
            redirect_url: RedirectUrl::new(cfg.spotify_redirect_uri.clone())?,
        })
    }

    /// Build the consent URL. `state` is carried through the redirect untouched.
    pub fn authorize_url(&self, state: &str) -> Url {
        let state = state.to_string();
        let (url, _csrf) = self
            .oauth2_client()
            .authorize_url(move || CsrfToken::new(state))
            .add_scopes(SPOTIFY_SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("show_dialog", "true")
            .url();
        url
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: AuthorizationCode,
        http_client: &reqwest::Client,
    ) -> Result<TokenSet, LinkError> {
        let token_result: SpotifyTokenResponse = self
            .oauth2_client()
            .exchange_code(code)
            .request_async(http_client)
            .await?;
        info!("OAuth2 code exchange completed successfully");
        TokenSet::from_response(&token_result, None)
    }

    /// Refresh-token grant for one user's credential.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
        http_client: &reqwest::Client,
    ) -> Result<TokenSet, LinkError> {
        // Fresh client per call: no cached token may leak into another user's refresh.
        let token_result: SpotifyTokenResponse = self
            .oauth2_client()
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(http_client)
            .await?;
        TokenSet::from_response(&token_result, Some(refresh_token))
    }

    fn oauth2_client(&self) -> SpotifyOauth2Client {
        OAuth2Client::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_auth_uri(self.auth_url.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(self.redirect_url.clone())
    }
}

pub(crate) type SpotifyOauth2Client = OAuth2Client<
    BasicErrorResponse,
    SpotifyTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;
