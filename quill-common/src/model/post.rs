use crate::model::{
    Id,
    group::{Group, GroupMarker},
    user::User,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    pub author: User,
    pub group: Option<Group>,
    /// Path of the uploaded image, relative to the media root.
    pub image: Option<String>,
}

/// The author-editable part of a post.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostContent {
    pub text: String,
    pub group: Option<Id<GroupMarker>>,
    pub image: Option<String>,
}

impl Post {
    #[must_use]
    pub fn content(&self) -> PostContent {
        PostContent {
            text: self.text.clone(),
            group: self.group.as_ref().map(|group| group.id),
            image: self.image.clone(),
        }
    }
}
