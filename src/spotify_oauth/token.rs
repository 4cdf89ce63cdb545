use crate::error::LinkError;
use chrono::{DateTime, Duration, Utc};
use oauth2::basic::BasicTokenType;
use oauth2::{EmptyExtraTokenFields, StandardTokenResponse, TokenResponse};
use serde::{Deserialize, Serialize};

pub(crate) type SpotifyTokenResponse = StandardTokenResponse<EmptyExtraTokenFields, BasicTokenType>;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Upper bound on a provider-reported lifetime.
const MAX_TOKEN_LIFETIME_SECS: i64 = 24 * 3600;

/// Access/refresh pair plus absolute expiry, ready to persist.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    /// Build from a token endpoint response. Spotify does not always rotate the
    /// refresh token, so `previous_refresh` is kept when the response has none.
    pub(crate) fn from_response(
        resp: &SpotifyTokenResponse,
        previous_refresh: Option<&str>,
    ) -> Result<Self, LinkError> {
        let refresh_token = resp
            .refresh_token()
            .map(|t| t.secret().to_string())
            .or_else(|| previous_refresh.map(str::to_string))
            .ok_or_else(|| LinkError::Oauth2Token("token response missing refresh_token".into()))?;

        let lifetime = resp
            .expires_in()
            .and_then(|d| Duration::from_std(d).ok())
            .filter(|d| *d > Duration::zero())
            .unwrap_or_else(|| Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS))
            .min(Duration::seconds(MAX_TOKEN_LIFETIME_SECS));
        let expires_at = Utc::now()
            .checked_add_signed(lifetime)
            .ok_or_else(|| LinkError::Oauth2Token("token expiry out of range".into()))?;

        Ok(Self {
            access_token: resp.access_token().secret().to_string(),
            refresh_token,
            expires_at,
        })
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
