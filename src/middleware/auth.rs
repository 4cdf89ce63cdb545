use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::debug;

use crate::db::AppUser;
use crate::error::LinkError;
use crate::router::AppState;

/// The authenticated application user.
///
/// Accepts `Authorization: Bearer <session token>` issued by the auth module and
/// resolves it against `user_sessions`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AppUser);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = LinkError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .typed_get::<Authorization<Bearer>>()
            .ok_or(LinkError::Unauthenticated)?;

        match state.store.user_for_session(token.token()).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                debug!("rejected unknown or expired session token");
                Err(LinkError::Unauthenticated)
            }
        }
    }
}
