use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use headers::{Authorization, Cookie, HeaderMapExt, authorization::Bearer};
use quill_common::model::{
    Id,
    auth::{AuthToken, SESSION_COOKIE},
    user::{User, UserMarker},
};
use quill_db::client::DbClient;
use std::sync::Arc;
use time::UtcDateTime;
use tracing::debug;

/// The user a request acts as.
///
/// Taken as `AuthenticatedUser`, anonymous requests are sent to the login page.
/// Taken as `Option<AuthenticatedUser>`, they are let through as `None`.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser {
    user: User,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(&self) -> Id<UserMarker> {
        self.user.id
    }

    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    #[must_use]
    pub fn into_user(self) -> User {
        self.user
    }
}

/// The raw token from a bearer header, falling back to the session cookie.
fn credential(parts: &Parts) -> Option<String> {
    if let Some(Authorization(bearer)) = parts.headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_owned());
    }

    parts
        .headers
        .typed_get::<Cookie>()
        .and_then(|cookie| cookie.get(SESSION_COOKIE).map(str::to_owned))
}

async fn authenticate<S>(parts: &Parts, state: &S) -> Result<Option<AuthenticatedUser>, ServerError>
where
    Arc<DbClient>: FromRef<S>,
{
    let Some(credential) = credential(parts) else {
        return Ok(None);
    };

    let request_token: AuthToken = match credential.parse() {
        Ok(token) => token,
        Err(err) => {
            debug!(error = %err, "Ignoring malformed auth token");
            return Ok(None);
        }
    };

    let token_hash = request_token.hash()?;

    let db = Arc::<DbClient>::from_ref(state);
    let Some(authentication) = db.fetch_auth(&token_hash).await? else {
        debug!(user_id = %request_token.user_id, "Ignoring unknown auth token");
        return Ok(None);
    };

    if authentication.user != request_token.user_id
        || authentication.is_expired_at(UtcDateTime::now())
    {
        debug!(user_id = %request_token.user_id, "Ignoring stale auth token");
        return Ok(None);
    }

    let user = db.fetch_user(authentication.user).await?;
    Ok(user.map(|user| AuthenticatedUser { user }))
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .await?
            .ok_or_else(|| ServerError::LoginRequired {
                next: parts
                    .uri
                    .path_and_query()
                    .map_or_else(|| parts.uri.path().to_owned(), ToString::to_string),
            })
    }
}

impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        authenticate(parts, state).await
    }
}
