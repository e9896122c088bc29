use crate::{
    server::{
        Result, ServerError, ServerRouter,
        auth::AuthenticatedUser,
        cache::{CachedPage, INDEX_PAGE_PREFIX, PageCache},
        extract::{Form, Query},
        forms::{CommentForm, PostForm},
        media::MediaStore,
        routes::profiles::ProfilePath,
        template::Template,
    },
    settings::Settings,
};
use axum::{
    extract::{Multipart, State, multipart::MultipartRejection},
    http::Uri,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use quill_common::{
    model::{
        Id,
        comment::Comment,
        group::Group,
        post::{Post, PostMarker},
        user::User,
    },
    paginate::{Page, PageQuery},
};
use quill_db::client::{DbClient, PostFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(index)
        .typed_post(index)
        .typed_get(post_detail)
        .typed_post(post_detail)
        .typed_get(post_create_form)
        .typed_post(post_create)
        .typed_get(post_edit_form)
        .typed_post(post_edit)
        .typed_post(add_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/", rejection(ServerError))]
pub struct IndexPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/", rejection(ServerError))]
pub struct PostDetailPath {
    pub id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/create/", rejection(ServerError))]
pub struct PostCreatePath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/edit/", rejection(ServerError))]
pub struct PostEditPath {
    pub id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comment/", rejection(ServerError))]
pub struct AddCommentPath {
    pub id: Id<PostMarker>,
}

/// Context of every paginated feed page.
#[derive(Serialize)]
pub struct FeedContext {
    pub viewer: Option<User>,
    pub page_obj: Page<Post>,
}

#[derive(Serialize)]
struct PostDetailContext {
    viewer: Option<User>,
    post: Post,
    comments: Vec<Comment>,
    form: CommentForm,
    author_posts_count: u64,
    is_author: bool,
}

#[derive(Serialize)]
struct PostFormContext {
    viewer: Option<User>,
    form: PostForm,
    groups: Vec<Group>,
    is_edit: bool,
    post: Option<Post>,
}

async fn index(
    IndexPath(): IndexPath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<Arc<Settings>>,
    State(cache): State<Arc<PageCache>>,
    viewer: Option<AuthenticatedUser>,
    Query(page): Query<PageQuery>,
    uri: Uri,
) -> Result<Response> {
    let viewer_key = viewer
        .as_ref()
        .map_or_else(|| "anonymous".to_owned(), |viewer| viewer.user_id().to_string());
    let key = format!("{INDEX_PAGE_PREFIX}:{viewer_key}:{uri}");

    if let Some(cached) = cache.get(&key) {
        debug!(%key, "Serving home feed from cache");
        return Ok(cached.into_response());
    }

    let page_obj = db
        .fetch_feed(PostFilter::All, settings.paginator, &page)
        .await?;
    let template = Template::new(
        "posts/index.html",
        &FeedContext {
            viewer: viewer.map(AuthenticatedUser::into_user),
            page_obj,
        },
    )?;

    cache.put(
        key,
        CachedPage::from(template.render()),
        settings.index_cache_ttl.to_std(),
    );

    Ok(template.into_response())
}

async fn post_detail(
    PostDetailPath { id }: PostDetailPath,
    State(db): State<Arc<DbClient>>,
    viewer: Option<AuthenticatedUser>,
) -> Result<Template> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    let comments = db.fetch_comments(id).await?;
    let author_posts_count = db.count_posts(PostFilter::Author(post.author.id)).await?;
    let is_author = viewer
        .as_ref()
        .is_some_and(|viewer| viewer.user_id() == post.author.id);

    Template::new(
        "posts/post_detail.html",
        &PostDetailContext {
            viewer: viewer.map(AuthenticatedUser::into_user),
            post,
            comments,
            form: CommentForm::default(),
            author_posts_count,
            is_author,
        },
    )
}

fn post_form_page(
    viewer: AuthenticatedUser,
    form: PostForm,
    groups: Vec<Group>,
    post: Option<Post>,
) -> Result<Template> {
    Template::new(
        "posts/create_post.html",
        &PostFormContext {
            viewer: Some(viewer.into_user()),
            form,
            groups,
            is_edit: post.is_some(),
            post,
        },
    )
}

async fn post_create_form(
    PostCreatePath(): PostCreatePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Template> {
    let groups = db.fetch_groups().await?;
    post_form_page(user, PostForm::default(), groups, None)
}

async fn post_create(
    PostCreatePath(): PostCreatePath,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
    user: AuthenticatedUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let mut form = PostForm::from_multipart(multipart?).await?;
    let groups = db.fetch_groups().await?;

    let Some(valid) = form.validate(&groups) else {
        debug!(errors = ?form.errors, "Post form rejected");
        return Ok(post_form_page(user, form, groups, None)?.into_response());
    };

    let content = valid.into_content(&media, None).await?;
    let post_id = db.create_post(&content, user.user_id()).await?;
    info!(%post_id, author_id = %user.user_id(), "Post published");

    Ok(Redirect::to(&ProfilePath::of(user.user()).to_string()).into_response())
}

/// Loads a post for editing, or the redirect for anyone but its author.
async fn editable_post(
    db: &DbClient,
    id: Id<PostMarker>,
    user: &AuthenticatedUser,
) -> Result<Result<Post, Redirect>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if post.author.id == user.user_id() {
        Ok(Ok(post))
    } else {
        debug!(post_id = %id, user_id = %user.user_id(), "Edit attempt by someone other than the author");
        Ok(Err(Redirect::to(&PostDetailPath { id }.to_string())))
    }
}

async fn post_edit_form(
    PostEditPath { id }: PostEditPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Response> {
    let post = match editable_post(&db, id, &user).await? {
        Ok(post) => post,
        Err(redirect) => return Ok(redirect.into_response()),
    };
    let groups = db.fetch_groups().await?;

    Ok(post_form_page(user, PostForm::for_post(&post), groups, Some(post))?.into_response())
}

async fn post_edit(
    PostEditPath { id }: PostEditPath,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
    user: AuthenticatedUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let post = match editable_post(&db, id, &user).await? {
        Ok(post) => post,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let mut form = PostForm::from_multipart(multipart?).await?;
    let groups = db.fetch_groups().await?;

    let Some(valid) = form.validate(&groups) else {
        debug!(post_id = %id, errors = ?form.errors, "Post edit rejected");
        return Ok(post_form_page(user, form, groups, Some(post))?.into_response());
    };

    let content = valid.into_content(&media, post.image.clone()).await?;
    db.update_post(id, &content).await?;
    info!(post_id = %id, "Post edited");

    Ok(Redirect::to(&PostDetailPath { id }.to_string()).into_response())
}

async fn add_comment(
    AddCommentPath { id }: AddCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Form(form): Form<CommentForm>,
) -> Result<Redirect> {
    if db.fetch_post(id).await?.is_none() {
        return Err(ServerError::PostByIdNotFound(id));
    }

    match form.validate() {
        Ok(text) => {
            let comment_id = db.create_comment(id, user.user_id(), &text).await?;
            info!(%comment_id, post_id = %id, "Comment added");
        }
        Err(err) => debug!(post_id = %id, error = %err, "Dropping invalid comment"),
    }

    Ok(Redirect::to(&PostDetailPath { id }.to_string()))
}
