use axum::{Json, http::StatusCode, response::IntoResponse};
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum LinkError {
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Corrupt stored value: {0}")]
    CorruptRow(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("spotify account not connected")]
    NotConnected,

    #[error("spotify already connected")]
    AlreadyConnected,

    #[error("invalid state parameter")]
    InvalidState,

    #[error("missing authorization code")]
    MissingCode,

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("OAuth2 token request error: {0}")]
    Oauth2Token(String),

    #[error("OAuth2 server error: {error}")]
    Oauth2Server { error: String },

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("{context}: {source}")]
    Provider {
        context: &'static str,
        #[source]
        source: Box<LinkError>,
    },
}

impl LinkError {
    /// Wrap a provider-side failure with the operation that was attempted.
    pub fn provider(context: &'static str, source: LinkError) -> Self {
        LinkError::Provider {
            context,
            source: Box::new(source),
        }
    }

    /// Network hiccups and 5xx/429 from the provider; anything else is final.
    pub fn is_transient(&self) -> bool {
        match self {
            LinkError::Reqwest(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            LinkError::UpstreamStatus(code) => {
                code.is_server_error() || *code == StatusCode::TOO_MANY_REQUESTS
            }
            LinkError::Provider { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

type SpotifyRequestTokenError = RequestTokenError<
    HttpClientError<ReqwestClientError>,
    StandardErrorResponse<BasicErrorResponseType>,
>;

impl From<SpotifyRequestTokenError> for LinkError {
    fn from(e: SpotifyRequestTokenError) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => LinkError::Oauth2Server {
                error: err.error().to_string(),
            },
            RequestTokenError::Request(wrapper) => match wrapper {
                HttpClientError::Reqwest(real_err) => LinkError::Reqwest(*real_err),
                other => LinkError::Oauth2Token(format!("request failed: {other}")),
            },
            RequestTokenError::Parse(parse_err, _body) => LinkError::Json(parse_err.into_inner()),
            RequestTokenError::Other(s) => LinkError::Oauth2Token(s),
        }
    }
}

impl IntoResponse for LinkError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = match &self {
            LinkError::AlreadyConnected
            | LinkError::InvalidState
            | LinkError::MissingCode
            | LinkError::InvalidQuery(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            LinkError::Unauthenticated | LinkError::NotConnected => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED")
            }
            LinkError::DatabaseError(_)
            | LinkError::CorruptRow(_)
            | LinkError::MissingConfig(_) => {
                let body = ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                };
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiErrorResponse { error: body }),
                )
                    .into_response();
            }
            LinkError::UrlParse(_)
            | LinkError::Reqwest(_)
            | LinkError::Json(_)
            | LinkError::Oauth2Token(_)
            | LinkError::Oauth2Server { .. }
            | LinkError::UpstreamStatus(_)
            | LinkError::Provider { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "PROVIDER_ERROR"),
        };

        let body = ApiErrorBody {
            code: code.to_string(),
            message: self.to_string(),
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
