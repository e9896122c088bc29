use crate::server::{
    Result, ServerError, ServerRouter, auth::AuthenticatedUser, extract::Query, template::Template,
};
use axum_extra::routing::{RouterExt, TypedPath};
use quill_common::model::user::User;
use serde::{Deserialize, Serialize};

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(login)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/login/", rejection(ServerError))]
pub struct LoginPath();

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct LoginQuery {
    next: Option<String>,
}

#[derive(Serialize)]
struct LoginContext {
    viewer: Option<User>,
    next: Option<String>,
}

/// The entry point of the external login flow.
async fn login(
    LoginPath(): LoginPath,
    viewer: Option<AuthenticatedUser>,
    Query(query): Query<LoginQuery>,
) -> Result<Template> {
    Template::new(
        "users/login.html",
        &LoginContext {
            viewer: viewer.map(AuthenticatedUser::into_user),
            next: query.next,
        },
    )
}
