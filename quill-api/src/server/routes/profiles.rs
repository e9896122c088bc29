use crate::{
    server::{
        Result, ServerError, ServerRouter, auth::AuthenticatedUser, extract::Query,
        routes::posts::FeedContext, template::Template,
    },
    settings::Settings,
};
use axum::{extract::State, response::Redirect};
use axum_extra::routing::{RouterExt, TypedPath};
use quill_common::{
    model::{
        follow::FollowPair,
        post::Post,
        user::{User, Username},
    },
    paginate::{Page, PageQuery},
};
use quill_db::client::{DbClient, PostFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(profile)
        .typed_post(profile)
        .typed_get(follow_index)
        .typed_post(follow_index)
        .typed_post(profile_follow)
        .typed_post(profile_unfollow)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/", rejection(ServerError))]
pub struct ProfilePath {
    pub username: String,
}

impl ProfilePath {
    #[must_use]
    pub fn of(user: &User) -> Self {
        Self {
            username: user.username.get().to_owned(),
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/follow/", rejection(ServerError))]
pub struct FollowIndexPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/follow/", rejection(ServerError))]
pub struct ProfileFollowPath {
    pub username: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/unfollow/", rejection(ServerError))]
pub struct ProfileUnfollowPath {
    pub username: String,
}

#[derive(Serialize)]
struct ProfileContext {
    viewer: Option<User>,
    author: User,
    page_obj: Page<Post>,
    following: bool,
}

async fn find_user(db: &DbClient, username: &str) -> Result<Option<User>> {
    let Ok(username) = Username::new(username.to_owned()) else {
        return Ok(None);
    };

    Ok(db.fetch_user_by_username(&username).await?)
}

async fn profile(
    ProfilePath { username }: ProfilePath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<Arc<Settings>>,
    viewer: Option<AuthenticatedUser>,
    Query(page): Query<PageQuery>,
) -> Result<Template> {
    let author = find_user(&db, &username)
        .await?
        .ok_or(ServerError::UserByUsernameNotFound(username))?;

    let page_obj = db
        .fetch_feed(PostFilter::Author(author.id), settings.paginator, &page)
        .await?;
    let following = match &viewer {
        Some(viewer) => db.is_following(viewer.user_id(), author.id).await?,
        None => false,
    };

    Template::new(
        "posts/profile.html",
        &ProfileContext {
            viewer: viewer.map(AuthenticatedUser::into_user),
            author,
            page_obj,
            following,
        },
    )
}

async fn follow_index(
    FollowIndexPath(): FollowIndexPath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<Arc<Settings>>,
    user: AuthenticatedUser,
    Query(page): Query<PageQuery>,
) -> Result<Template> {
    let page_obj = db
        .fetch_feed(PostFilter::FollowedBy(user.user_id()), settings.paginator, &page)
        .await?;

    Template::new(
        "posts/follow.html",
        &FeedContext {
            viewer: Some(user.into_user()),
            page_obj,
        },
    )
}

async fn profile_follow(
    ProfileFollowPath { username }: ProfileFollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Redirect> {
    let author = find_user(&db, &username)
        .await?
        .ok_or_else(|| ServerError::UserByUsernameNotFound(username.clone()))?;

    match FollowPair::new(user.user_id(), author.id) {
        Ok(pair) => {
            if db.follow(pair).await? {
                info!(user_id = %user.user_id(), author_id = %author.id, "Followed author");
            }
        }
        Err(err) => debug!(error = %err, "Ignoring attempt to follow oneself"),
    }

    Ok(Redirect::to(&ProfilePath { username }.to_string()))
}

async fn profile_unfollow(
    ProfileUnfollowPath { username }: ProfileUnfollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Redirect> {
    if let Some(author) = find_user(&db, &username).await?
        && db.unfollow(user.user_id(), author.id).await?
    {
        info!(user_id = %user.user_id(), author_id = %author.id, "Unfollowed author");
    }

    Ok(Redirect::to(&ProfilePath { username }.to_string()))
}
