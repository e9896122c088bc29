use crate::settings::Settings;
use axum::{
    Router,
    extract::{
        DefaultBodyLimit, FromRef, Request,
        multipart::{MultipartError, MultipartRejection},
        rejection::{FormRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use cache::PageCache;
use media::MediaStore;
use quill_common::model::{Id, auth::AuthTokenHashError, post::PostMarker};
use quill_db::client::{DbClient, DbError};
use routes::auth::LoginPath;
use serde_json::json;
use std::sync::Arc;
use template::Template;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

pub mod auth;
pub mod cache;
mod extract;
mod forms;
pub mod media;
mod routes;
pub mod template;


/// Uploads beyond this are refused before a handler sees them.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub settings: Arc<Settings>,
    pub index_cache: Arc<PageCache>,
    pub media: Arc<MediaStore>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

/// The complete application with its middleware, ready to serve.
pub fn app(state: ServerState) -> Router {
    routes()
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming form rejected: {0}")]
    FormRejection(#[from] FormRejection),
    #[error("Incoming multipart body rejected: {0}")]
    MultipartRejection(#[from] MultipartRejection),
    #[error("Multipart body could not be read: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Login required to access {next}")]
    LoginRequired { next: String },
    #[error("Template context could not be serialized: {0}")]
    TemplateContext(#[from] serde_json::Error),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error("Uploaded file could not be stored: {0}")]
    Media(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Group with slug {0:?} was not found.")]
    GroupBySlugNotFound(String),
    #[error("User with username {0:?} was not found.")]
    UserByUsernameNotFound(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::GroupBySlugNotFound(_)
            | ServerError::UserByUsernameNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::LoginRequired { .. } => StatusCode::SEE_OTHER,
            ServerError::QueryRejection(_)
            | ServerError::FormRejection(_)
            | ServerError::MultipartRejection(_)
            | ServerError::Multipart(_) => StatusCode::BAD_REQUEST,
            ServerError::TemplateContext(_)
            | ServerError::AuthTokenHash(_)
            | ServerError::Media(_)
            | ServerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_template(status: StatusCode) -> &'static str {
        match status {
            StatusCode::NOT_FOUND => "core/404.html",
            StatusCode::BAD_REQUEST => "core/400.html",
            _ => "core/500.html",
        }
    }
}

/// Where an anonymous visitor is sent, remembering the page they asked for.
pub fn login_redirect_target(next: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();

    format!("{}?{query}", LoginPath())
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if let ServerError::LoginRequired { next } = &self {
            warn!(%next, "Anonymous request to a page that needs a login");
            return Redirect::to(&login_redirect_target(next)).into_response();
        }

        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let path = match &self {
            ServerError::UnknownRoute(uri) => Some(uri.path().to_owned()),
            _ => None,
        };
        let template = Template::from_value(
            Self::error_template(status),
            json!({ "viewer": null, "status": status.as_u16(), "path": path }),
        );

        (status, template).into_response()
    }
}
