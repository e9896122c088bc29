use crate::{
    server::{
        Result, ServerError, ServerRouter, auth::AuthenticatedUser, extract::Query,
        template::Template,
    },
    settings::Settings,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use quill_common::{
    model::{
        group::{Group, GroupSlug},
        post::Post,
        user::User,
    },
    paginate::{Page, PageQuery},
};
use quill_db::client::{DbClient, PostFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(group_posts)
        .typed_post(group_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/group/{slug}/", rejection(ServerError))]
pub struct GroupPostsPath {
    pub slug: String,
}

#[derive(Serialize)]
struct GroupContext {
    viewer: Option<User>,
    group: Group,
    page_obj: Page<Post>,
}

async fn group_posts(
    GroupPostsPath { slug }: GroupPostsPath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<Arc<Settings>>,
    viewer: Option<AuthenticatedUser>,
    Query(page): Query<PageQuery>,
) -> Result<Template> {
    // A slug that cannot exist is reported like one that does not.
    let Ok(valid_slug) = GroupSlug::new(slug.clone()) else {
        return Err(ServerError::GroupBySlugNotFound(slug));
    };
    let group = db
        .fetch_group_by_slug(&valid_slug)
        .await?
        .ok_or(ServerError::GroupBySlugNotFound(slug))?;

    let page_obj = db
        .fetch_feed(PostFilter::Group(group.id), settings.paginator, &page)
        .await?;

    Template::new(
        "posts/group_list.html",
        &GroupContext {
            viewer: viewer.map(AuthenticatedUser::into_user),
            group,
            page_obj,
        },
    )
}
