use crate::error::LinkError;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::{
    net::{IpAddr, Ipv4Addr},
    sync::LazyLock,
};
use url::Url;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// HTTP server listen address (e.g., "0.0.0.0", "127.0.0.1").
    /// Env: `LISTEN_ADDR`. Default: `0.0.0.0`.
    #[serde(default = "default_listen_ip")]
    pub listen_addr: IpAddr,

    /// HTTP server listen port.
    /// Env: `LISTEN_PORT`. Default: `8000`.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Database URL for SQLite.
    /// Env: `DATABASE_URL`. Default: `sqlite://data.db`.
    #[serde(default)]
    pub database_url: String,

    /// Log level used when `RUST_LOG` is unset.
    /// Env: `LOGLEVEL`. Default: `info`.
    #[serde(default)]
    pub loglevel: String,

    /// Optional upstream HTTP proxy for provider calls.
    /// Env: `PROXY`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Env: `SPOTIFY_CLIENT_ID`. Required.
    #[serde(default)]
    pub spotify_client_id: String,

    /// Env: `SPOTIFY_CLIENT_SECRET`. Required.
    #[serde(default)]
    pub spotify_client_secret: String,

    /// Callback registered with the Spotify app, e.g. `https://host/api/spotify/callback`.
    /// Env: `SPOTIFY_REDIRECT_URI`. Required.
    #[serde(default)]
    pub spotify_redirect_uri: String,

    /// Where the browser lands after the OAuth callback.
    /// Env: `FRONTEND_URL`. Default: `http://localhost:3000`.
    #[serde(default)]
    pub frontend_url: String,

    /// Env: `SPOTIFY_AUTH_URL`. Default: Spotify accounts authorize endpoint.
    #[serde(default)]
    pub spotify_auth_url: String,

    /// Env: `SPOTIFY_TOKEN_URL`. Default: Spotify accounts token endpoint.
    #[serde(default)]
    pub spotify_token_url: String,

    /// Env: `SPOTIFY_API_BASE`. Default: `https://api.spotify.com/v1`.
    #[serde(default)]
    pub spotify_api_base: String,

    /// Max library syncs processed concurrently by the background worker.
    /// Env: `SYNC_CONCURRENCY`. Default: `4`.
    #[serde(default)]
    pub sync_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_ip(),
            listen_port: default_listen_port(),
            database_url: "sqlite://data.db".to_string(),
            loglevel: "info".to_string(),
            proxy: None,
            spotify_client_id: String::new(),
            spotify_client_secret: String::new(),
            spotify_redirect_uri: String::new(),
            frontend_url: "http://localhost:3000".to_string(),
            spotify_auth_url: SPOTIFY_AUTH_URL.to_string(),
            spotify_token_url: SPOTIFY_TOKEN_URL.to_string(),
            spotify_api_base: SPOTIFY_API_BASE.to_string(),
            sync_concurrency: 4,
        }
    }
}

impl Config {
    /// Builds a Figment that merges defaults and environment variables.
    /// Uses raw env mapping, so field names map to env vars in UPPER_SNAKE_CASE.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::raw())
    }

    /// Loads configuration from the environment (with defaults) and validates required fields.
    pub fn from_env() -> Self {
        let cfg: Self = Self::figment()
            .extract()
            .expect("failed to extract configuration via Figment");
        if let Err(e) = cfg.validate() {
            panic!("{e}");
        }
        cfg
    }

    /// Provider credentials and every URL must be present and parseable.
    pub fn validate(&self) -> Result<(), LinkError> {
        let required = [
            ("SPOTIFY_CLIENT_ID", &self.spotify_client_id),
            ("SPOTIFY_CLIENT_SECRET", &self.spotify_client_secret),
            ("SPOTIFY_REDIRECT_URI", &self.spotify_redirect_uri),
        ];
        if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(LinkError::MissingConfig(*name));
        }

        for raw in [
            &self.spotify_redirect_uri,
            &self.frontend_url,
            &self.spotify_auth_url,
            &self.spotify_token_url,
            &self.spotify_api_base,
        ] {
            Url::parse(raw)?;
        }
        Ok(())
    }
}

/// Global, lazily-initialized configuration instance.
pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::from_env);

pub const SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

pub const LINK_USER_AGENT: &str = "tubify-link/0.1";

/// Default IP address for the HTTP server listen address.
pub fn default_listen_ip() -> IpAddr {
    Ipv4Addr::new(0, 0, 0, 0).into()
}

/// Default port for the HTTP server.
pub fn default_listen_port() -> u16 {
    8000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> Config {
        Config {
            spotify_client_id: "id".to_string(),
            spotify_client_secret: "secret".to_string(),
            spotify_redirect_uri: "http://localhost:8000/api/spotify/callback".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn defaults_point_at_public_spotify_endpoints() {
        let cfg = Config::default();
        assert_eq!(cfg.spotify_api_base, "https://api.spotify.com/v1");
        assert_eq!(cfg.database_url, "sqlite://data.db");
        assert_eq!(cfg.sync_concurrency, 4);
    }

    #[test]
    fn validate_reports_first_missing_provider_credential() {
        let mut cfg = filled();
        cfg.spotify_client_secret = "  ".to_string();
        match cfg.validate() {
            Err(LinkError::MissingConfig(name)) => assert_eq!(name, "SPOTIFY_CLIENT_SECRET"),
            other => panic!("expected MissingConfig, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_unparseable_frontend_url() {
        let mut cfg = filled();
        cfg.frontend_url = "not a url".to_string();
        assert!(matches!(cfg.validate(), Err(LinkError::UrlParse(_))));
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(filled().validate().is_ok());
    }
}
