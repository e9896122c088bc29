use crate::record::{
    AuthenticationRecord, CommentRecord, FollowRecord, GroupRecord, PostRecord, UserRecord,
};
use quill_common::{
    model::{
        Id, ModelValidationError, Timestamp,
        auth::{AuthTokenHash, Authentication},
        comment::{Comment, CommentMarker, CommentText},
        follow::{Follow, FollowPair},
        group::{CreateGroup, Group, GroupMarker, GroupSlug},
        post::{Post, PostContent, PostMarker},
        user::{CreateUser, User, UserMarker, Username},
    },
    paginate::{Page, PageQuery, Paginator},
};
use sqlx::{
    SqlitePool,
    error::ErrorKind,
    migrate::MigrateError,
    query, query_as, query_scalar,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;
use thiserror::Error;
use time::PrimitiveDateTime;
use tracing::{debug, info};

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum ConstraintKind {
    Unique,
    Check,
    ForeignKey,
    NotNull,
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("A {kind:?} constraint rejected the write: {message}")]
    Constraint { kind: ConstraintKind, message: String },
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] MigrateError),
    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let kind = match db_err.kind() {
                ErrorKind::UniqueViolation => Some(ConstraintKind::Unique),
                ErrorKind::CheckViolation => Some(ConstraintKind::Check),
                ErrorKind::ForeignKeyViolation => Some(ConstraintKind::ForeignKey),
                ErrorKind::NotNullViolation => Some(ConstraintKind::NotNull),
                _ => None,
            };

            if let Some(kind) = kind {
                return DbError::Constraint {
                    kind,
                    message: db_err.message().to_owned(),
                };
            }
        }

        DbError::Sqlx(err)
    }
}

/// Which posts a feed shows. Every feed is ordered newest first.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum PostFilter {
    All,
    Group(Id<GroupMarker>),
    Author(Id<UserMarker>),
    /// Posts by every author the given user follows.
    FollowedBy(Id<UserMarker>),
}

impl PostFilter {
    fn condition(self) -> (&'static str, Option<i64>) {
        match self {
            PostFilter::All => ("", None),
            PostFilter::Group(group_id) => ("WHERE posts.group_id = ?", Some(group_id.get())),
            PostFilter::Author(author_id) => ("WHERE posts.author_id = ?", Some(author_id.get())),
            PostFilter::FollowedBy(user_id) => (
                "WHERE posts.author_id IN (
                    SELECT follows.author_id FROM follows WHERE follows.user_id = ?
                )",
                Some(user_id.get()),
            ),
        }
    }
}

const POST_SELECT: &str = "
    SELECT
        posts.post_id,
        posts.text,
        posts.pub_date,
        posts.image,
        users.user_id AS author_id,
        users.username AS author_username,
        post_groups.group_id AS group_id,
        post_groups.title AS group_title,
        post_groups.slug AS group_slug,
        post_groups.description AS group_description
    FROM
        posts
        JOIN users ON users.user_id = posts.author_id
        LEFT JOIN post_groups ON post_groups.group_id = posts.group_id
";

const POST_ORDER: &str = "ORDER BY posts.pub_date DESC, posts.post_id DESC";

#[derive(Clone, Debug)]
pub struct DbClient {
    pool: SqlitePool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `url` and applies the migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let client = Self::new(pool);
        client.migrate().await?;

        info!(url, "Connected to database");
        Ok(client)
    }

    /// A private, migrated database that lives as long as the client.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .test_before_acquire(false)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let client = Self::new(pool);
        client.migrate().await?;

        Ok(client)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_id,
                users.username
            FROM
                users
            WHERE
                users.user_id = ?
            ",
        )
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_id,
                users.username
            FROM
                users
            WHERE
                users.username = ?
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO users (username)
            VALUES (?)
            RETURNING user_id, username
            ",
        )
        .bind(user.username.get())
        .fetch_one(&self.pool)
        .await?;

        debug!(user_id = record.user_id, "Created user");
        Ok(record.try_into()?)
    }

    /// Removes a user together with their posts, comments, follows and sessions.
    pub async fn delete_user(&self, user_id: Id<UserMarker>) -> Result<bool> {
        let result = query("DELETE FROM users WHERE user_id = ?")
            .bind(user_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        let created_at = PrimitiveDateTime::new(
            authentication.created_at.date(),
            authentication.created_at.time(),
        );

        query(
            "
            INSERT INTO auth_tokens (token_hash, user_id, created_at, expires_after_seconds)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(&authentication.token_hash.0[..])
        .bind(authentication.user.get())
        .bind(created_at)
        .bind(
            authentication
                .expires_after
                .map(|expires_after| expires_after.whole_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                auth_tokens.user_id,
                auth_tokens.token_hash,
                auth_tokens.created_at,
                auth_tokens.expires_after_seconds
            FROM
                auth_tokens
            WHERE
                auth_tokens.token_hash = ?
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    pub async fn create_group(&self, group: &CreateGroup) -> Result<Group> {
        let record = query_as::<_, GroupRecord>(
            "
            INSERT INTO post_groups (title, slug, description)
            VALUES (?, ?, ?)
            RETURNING group_id, title, slug, description
            ",
        )
        .bind(&group.title)
        .bind(group.slug.get())
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await?;

        debug!(group_id = record.group_id, slug = %record.slug, "Created group");
        Ok(record.try_into()?)
    }

    pub async fn fetch_group_by_slug(&self, slug: &GroupSlug) -> Result<Option<Group>> {
        let record = query_as::<_, GroupRecord>(
            "
            SELECT group_id, title, slug, description
            FROM post_groups
            WHERE slug = ?
            ",
        )
        .bind(slug.get())
        .fetch_optional(&self.pool)
        .await?;

        let group = record.map(Group::try_from).transpose()?;
        Ok(group)
    }

    /// All groups, by title. Feeds the group selector of the post form.
    pub async fn fetch_groups(&self) -> Result<Vec<Group>> {
        let records = query_as::<_, GroupRecord>(
            "
            SELECT group_id, title, slug, description
            FROM post_groups
            ORDER BY title, group_id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let groups = records
            .into_iter()
            .map(Group::try_from)
            .collect::<Result<_, _>>()?;
        Ok(groups)
    }

    /// Removes a group. Its posts stay, without a group.
    pub async fn delete_group(&self, group_id: Id<GroupMarker>) -> Result<bool> {
        let result = query("DELETE FROM post_groups WHERE group_id = ?")
            .bind(group_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn create_post(
        &self,
        content: &PostContent,
        author: Id<UserMarker>,
    ) -> Result<Id<PostMarker>> {
        let post_id = query_scalar::<_, i64>(
            "
            INSERT INTO posts (text, pub_date, author_id, group_id, image)
            VALUES (?, ?, ?, ?, ?)
            RETURNING post_id
            ",
        )
        .bind(&content.text)
        .bind(Timestamp::now().unix_micros())
        .bind(author.get())
        .bind(content.group.map(Id::get))
        .bind(content.image.as_deref())
        .fetch_one(&self.pool)
        .await?;

        debug!(post_id, author_id = author.get(), "Created post");
        Ok(post_id.into())
    }

    /// Replaces the editable fields of a post. Author and publication date never change.
    pub async fn update_post(&self, post_id: Id<PostMarker>, content: &PostContent) -> Result<bool> {
        let result = query(
            "
            UPDATE posts
            SET text = ?, group_id = ?, image = ?
            WHERE post_id = ?
            ",
        )
        .bind(&content.text)
        .bind(content.group.map(Id::get))
        .bind(content.image.as_deref())
        .bind(post_id.get())
        .execute(&self.pool)
        .await?;

        debug!(post_id = post_id.get(), "Updated post");
        Ok(result.rows_affected() > 0)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let sql = format!("{POST_SELECT} WHERE posts.post_id = ?");
        let record = query_as::<_, PostRecord>(&sql)
            .bind(post_id.get())
            .fetch_optional(&self.pool)
            .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM posts WHERE post_id = ?")
            .bind(post_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes every post. Returns how many were removed.
    pub async fn delete_all_posts(&self) -> Result<u64> {
        let result = query("DELETE FROM posts").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn count_posts(&self, filter: PostFilter) -> Result<u64> {
        let (condition, param) = filter.condition();
        let sql = format!("SELECT COUNT(*) FROM posts {condition}");

        let mut count_query = query_scalar::<_, i64>(&sql);
        if let Some(param) = param {
            count_query = count_query.bind(param);
        }
        let count = count_query.fetch_one(&self.pool).await?;

        Ok(count.try_into().unwrap_or_default())
    }

    /// One page of the feed selected by `filter`.
    pub async fn fetch_feed(
        &self,
        filter: PostFilter,
        paginator: Paginator,
        page: &PageQuery,
    ) -> Result<Page<Post>> {
        let count = self.count_posts(filter).await?;
        let window = paginator.window(count, page);

        let (condition, param) = filter.condition();
        let sql = format!("{POST_SELECT} {condition} {POST_ORDER} LIMIT ? OFFSET ?");

        let mut feed_query = query_as::<_, PostRecord>(&sql);
        if let Some(param) = param {
            feed_query = feed_query.bind(param);
        }
        let records = feed_query
            .bind(i64::try_from(window.limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(window.offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(window.into_page(posts))
    }

    pub async fn create_comment(
        &self,
        post_id: Id<PostMarker>,
        author: Id<UserMarker>,
        text: &CommentText,
    ) -> Result<Id<CommentMarker>> {
        let comment_id = query_scalar::<_, i64>(
            "
            INSERT INTO comments (post_id, author_id, text, created)
            VALUES (?, ?, ?, ?)
            RETURNING comment_id
            ",
        )
        .bind(post_id.get())
        .bind(author.get())
        .bind(text.get())
        .bind(Timestamp::now().unix_micros())
        .fetch_one(&self.pool)
        .await?;

        debug!(comment_id, post_id = post_id.get(), "Created comment");
        Ok(comment_id.into())
    }

    /// Comments of a post, oldest first.
    pub async fn fetch_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.comment_id,
                comments.post_id,
                comments.text,
                comments.created,
                users.user_id AS author_id,
                users.username AS author_username
            FROM
                comments
                JOIN users ON users.user_id = comments.author_id
            WHERE
                comments.post_id = ?
            ORDER BY comments.created, comments.comment_id
            ",
        )
        .bind(post_id.get())
        .fetch_all(&self.pool)
        .await?;

        let comments = records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?;
        Ok(comments)
    }

    /// Stores the follow unless it already exists. Returns whether a row was created.
    pub async fn follow(&self, pair: FollowPair) -> Result<bool> {
        let result = query(
            "
            INSERT INTO follows (user_id, author_id)
            VALUES (?, ?)
            ON CONFLICT (user_id, author_id) DO NOTHING
            ",
        )
        .bind(pair.user().get())
        .bind(pair.author().get())
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() > 0;
        debug!(
            user_id = pair.user().get(),
            author_id = pair.author().get(),
            created,
            "Follow"
        );
        Ok(created)
    }

    /// Plain insert without any checks, rejected by the schema on duplicates and self follows.
    pub async fn insert_follow(
        &self,
        user: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<Follow> {
        let record = query_as::<_, FollowRecord>(
            "
            INSERT INTO follows (user_id, author_id)
            VALUES (?, ?)
            RETURNING follow_id, user_id, author_id
            ",
        )
        .bind(user.get())
        .bind(author.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }

    /// Deletes the follow if present. Returns whether a row was deleted.
    pub async fn unfollow(&self, user: Id<UserMarker>, author: Id<UserMarker>) -> Result<bool> {
        let result = query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user.get())
            .bind(author.get())
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        debug!(
            user_id = user.get(),
            author_id = author.get(),
            deleted,
            "Unfollow"
        );
        Ok(deleted)
    }

    pub async fn fetch_follow(
        &self,
        user: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<Option<Follow>> {
        let record = query_as::<_, FollowRecord>(
            "
            SELECT follow_id, user_id, author_id
            FROM follows
            WHERE user_id = ? AND author_id = ?
            ",
        )
        .bind(user.get())
        .bind(author.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Follow::from))
    }

    pub async fn is_following(&self, user: Id<UserMarker>, author: Id<UserMarker>) -> Result<bool> {
        Ok(self.fetch_follow(user, author).await?.is_some())
    }

    pub async fn count_follows(&self) -> Result<u64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM follows")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.try_into().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use crate::client::{ConstraintKind, DbClient, DbError, PostFilter};
    use quill_common::{
        model::{
            Id,
            auth::AuthToken,
            comment::CommentText,
            follow::FollowPair,
            group::{CreateGroup, Group, GroupSlug},
            post::PostContent,
            user::{CreateUser, User, Username},
        },
        paginate::{PageQuery, Paginator},
    };
    use std::num::NonZeroU32;
    use time::OffsetDateTime;

    async fn user(db: &DbClient, username: &str) -> User {
        let username = Username::new(username.to_owned()).unwrap();
        db.create_user(&CreateUser { username }).await.unwrap()
    }

    async fn group(db: &DbClient, slug: &str) -> Group {
        let slug = GroupSlug::new(slug.to_owned()).unwrap();
        let group = CreateGroup::new(format!("Group {}", slug.get()), slug, String::new()).unwrap();
        db.create_group(&group).await.unwrap()
    }

    fn content(text: &str, group: Option<&Group>) -> PostContent {
        PostContent {
            text: text.to_owned(),
            group: group.map(|group| group.id),
            image: None,
        }
    }

    #[tokio::test]
    async fn posts_round_trip() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let author = user(&db, "Stas").await;
        let cats = group(&db, "cats").await;

        let post_id = db
            .create_post(
                &PostContent {
                    text: "Test post".to_owned(),
                    group: Some(cats.id),
                    image: Some("posts/small.gif".to_owned()),
                },
                author.id,
            )
            .await
            .unwrap();

        let post = db.fetch_post(post_id).await.unwrap().unwrap();
        assert_eq!(post.text, "Test post");
        assert_eq!(post.author, author);
        assert_eq!(post.group, Some(cats));
        assert_eq!(post.image.as_deref(), Some("posts/small.gif"));

        assert!(db.fetch_post(Id::new(9999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dates_are_stored_as_unix_micros() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let author = user(&db, "Stas").await;
        let before = OffsetDateTime::now_utc();
        let post_id = db.create_post(&content("post", None), author.id).await.unwrap();
        let text = CommentText::new("comment".to_owned()).unwrap();
        db.create_comment(post_id, author.id, &text).await.unwrap();

        let kinds: (String, String) = sqlx::query_as(
            "SELECT typeof(posts.pub_date), typeof(comments.created) FROM posts JOIN comments USING (post_id)",
        )
        .fetch_one(&db.pool)
        .await
        .unwrap();
        assert_eq!(kinds, ("integer".to_owned(), "integer".to_owned()));

        let post = db.fetch_post(post_id).await.unwrap().unwrap();
        let comments = db.fetch_comments(post_id).await.unwrap();
        assert!(post.pub_date >= before - time::Duration::seconds(1));
        assert!(comments[0].created >= post.pub_date);
    }

    #[tokio::test]
    async fn update_keeps_author_and_date() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let author = user(&db, "Stas").await;
        let cats = group(&db, "cats").await;
        let dogs = group(&db, "dogs").await;

        let post_id = db
            .create_post(&content("Before", Some(&cats)), author.id)
            .await
            .unwrap();
        let before = db.fetch_post(post_id).await.unwrap().unwrap();

        assert!(
            db.update_post(post_id, &content("After", Some(&dogs)))
                .await
                .unwrap()
        );
        let after = db.fetch_post(post_id).await.unwrap().unwrap();

        assert_eq!(after.text, "After");
        assert_eq!(after.group, Some(dogs));
        assert_eq!(after.author, before.author);
        assert_eq!(after.pub_date, before.pub_date);

        assert!(!db.update_post(Id::new(9999), &content("x", None)).await.unwrap());
    }

    #[tokio::test]
    async fn feeds_are_filtered_and_newest_first() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let stas = user(&db, "Stas").await;
        let ivan = user(&db, "Ivan").await;
        let olga = user(&db, "Olga").await;
        let cats = group(&db, "cats").await;

        let first = db.create_post(&content("first", Some(&cats)), stas.id).await.unwrap();
        let second = db.create_post(&content("second", None), ivan.id).await.unwrap();
        let third = db.create_post(&content("third", Some(&cats)), olga.id).await.unwrap();

        let db = &db;
        let paginator = Paginator::default();
        let ids = |filter| async move {
            db.fetch_feed(filter, paginator, &PageQuery::default())
                .await
                .unwrap()
                .object_list
                .into_iter()
                .map(|post| post.id)
                .collect::<Vec<_>>()
        };

        assert_eq!(ids(PostFilter::All).await, vec![third, second, first]);
        assert_eq!(ids(PostFilter::Group(cats.id)).await, vec![third, first]);
        assert_eq!(ids(PostFilter::Author(ivan.id)).await, vec![second]);
        assert!(ids(PostFilter::FollowedBy(stas.id)).await.is_empty());

        db.follow(FollowPair::new(stas.id, ivan.id).unwrap()).await.unwrap();
        db.follow(FollowPair::new(stas.id, olga.id).unwrap()).await.unwrap();
        assert_eq!(ids(PostFilter::FollowedBy(stas.id)).await, vec![third, second]);
        assert!(ids(PostFilter::FollowedBy(ivan.id)).await.is_empty());
    }

    #[tokio::test]
    async fn feed_pages() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let author = user(&db, "Stas").await;
        for n in 0..13 {
            db.create_post(&content(&format!("Test {n}"), None), author.id)
                .await
                .unwrap();
        }

        let paginator = Paginator::new(NonZeroU32::new(10).unwrap());
        let first = db
            .fetch_feed(PostFilter::All, paginator, &PageQuery::number(1))
            .await
            .unwrap();
        let second = db
            .fetch_feed(PostFilter::All, paginator, &PageQuery::number(2))
            .await
            .unwrap();

        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 3);
        assert_eq!(first.count, 13);
        assert_eq!(first.object_list[0].text, "Test 12");
        assert_eq!(second.object_list[2].text, "Test 0");
        assert_eq!(db.count_posts(PostFilter::Author(author.id)).await.unwrap(), 13);
    }

    #[tokio::test]
    async fn follow_constraints_hold_in_the_store() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let stas = user(&db, "Stas").await;
        let ivan = user(&db, "Ivan").await;

        let follow = db.insert_follow(ivan.id, stas.id).await.unwrap();
        assert_eq!((follow.user, follow.author), (ivan.id, stas.id));

        let duplicate = db.insert_follow(ivan.id, stas.id).await;
        assert!(matches!(
            duplicate,
            Err(DbError::Constraint {
                kind: ConstraintKind::Unique,
                ..
            })
        ));

        let self_follow = db.insert_follow(stas.id, stas.id).await;
        assert!(matches!(
            self_follow,
            Err(DbError::Constraint {
                kind: ConstraintKind::Check,
                ..
            })
        ));

        assert_eq!(db.count_follows().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn follow_is_idempotent_and_unfollow_tolerates_absence() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let stas = user(&db, "Stas").await;
        let ivan = user(&db, "Ivan").await;
        let pair = FollowPair::new(ivan.id, stas.id).unwrap();

        assert!(db.follow(pair).await.unwrap());
        assert!(!db.follow(pair).await.unwrap());
        assert_eq!(db.count_follows().await.unwrap(), 1);
        assert!(db.is_following(ivan.id, stas.id).await.unwrap());
        assert!(!db.is_following(stas.id, ivan.id).await.unwrap());

        assert!(db.unfollow(ivan.id, stas.id).await.unwrap());
        assert!(!db.unfollow(ivan.id, stas.id).await.unwrap());
        assert_eq!(db.count_follows().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deleting_a_user_cascades() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let stas = user(&db, "Stas").await;
        let ivan = user(&db, "Ivan").await;

        let stas_post = db.create_post(&content("mine", None), stas.id).await.unwrap();
        let ivan_post = db.create_post(&content("his", None), ivan.id).await.unwrap();
        let text = CommentText::new("Nice".to_owned()).unwrap();
        db.create_comment(ivan_post, stas.id, &text).await.unwrap();
        db.create_comment(stas_post, ivan.id, &text).await.unwrap();
        db.follow(FollowPair::new(ivan.id, stas.id).unwrap()).await.unwrap();
        db.follow(FollowPair::new(stas.id, ivan.id).unwrap()).await.unwrap();

        assert!(db.delete_user(stas.id).await.unwrap());

        assert!(db.fetch_post(stas_post).await.unwrap().is_none());
        assert!(db.fetch_comments(ivan_post).await.unwrap().is_empty());
        assert_eq!(db.count_follows().await.unwrap(), 0);
        assert!(db.fetch_post(ivan_post).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deleting_a_post_removes_its_comments() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let stas = user(&db, "Stas").await;
        let post_id = db.create_post(&content("post", None), stas.id).await.unwrap();
        let text = CommentText::new("First!".to_owned()).unwrap();
        db.create_comment(post_id, stas.id, &text).await.unwrap();

        assert!(db.delete_post(post_id).await.unwrap());
        assert!(db.fetch_comments(post_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_group_keeps_its_posts() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let stas = user(&db, "Stas").await;
        let cats = group(&db, "cats").await;
        let post_id = db.create_post(&content("cat", Some(&cats)), stas.id).await.unwrap();

        assert!(db.delete_group(cats.id).await.unwrap());

        let post = db.fetch_post(post_id).await.unwrap().unwrap();
        assert_eq!(post.group, None);
        assert!(db.fetch_group_by_slug(&cats.slug).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn group_slugs_are_unique() {
        let db = DbClient::connect_in_memory().await.unwrap();
        group(&db, "cats").await;

        let slug = GroupSlug::new("cats".to_owned()).unwrap();
        let again = CreateGroup::new("Other cats".to_owned(), slug, String::new()).unwrap();
        assert!(matches!(
            db.create_group(&again).await,
            Err(DbError::Constraint {
                kind: ConstraintKind::Unique,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn comments_oldest_first() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let stas = user(&db, "Stas").await;
        let ivan = user(&db, "Ivan").await;
        let post_id = db.create_post(&content("post", None), stas.id).await.unwrap();

        for (author, text) in [(&ivan, "one"), (&stas, "two"), (&ivan, "three")] {
            let text = CommentText::new(text.to_owned()).unwrap();
            db.create_comment(post_id, author.id, &text).await.unwrap();
        }

        let comments = db.fetch_comments(post_id).await.unwrap();
        let texts: Vec<_> = comments.iter().map(|comment| comment.text.get()).collect();
        assert_eq!(texts, ["one", "two", "three"]);
        assert_eq!(comments[1].author, stas);
    }

    #[tokio::test]
    async fn sessions_round_trip() {
        let db = DbClient::connect_in_memory().await.unwrap();
        let stas = user(&db, "Stas").await;

        let (token, authentication) = AuthToken::issue(stas.id, None).unwrap();
        db.create_auth(&authentication).await.unwrap();

        let stored = db.fetch_auth(&token.hash().unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.user, stas.id);
        assert_eq!(stored.token_hash, authentication.token_hash);

        let stranger = AuthToken::generate_random(stas.id);
        assert!(db.fetch_auth(&stranger.hash().unwrap()).await.unwrap().is_none());
    }
}
