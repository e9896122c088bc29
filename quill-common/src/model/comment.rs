use crate::model::{Id, post::PostMarker, user::User};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

pub const COMMENT_TEXT_MAX_LEN: usize = 250;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post: Id<PostMarker>,
    pub author: User,
    pub text: CommentText,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
pub enum InvalidCommentTextError {
    #[default]
    #[error("The comment is empty")]
    Blank,
    #[error("The comment has {0} characters, at most {max} are allowed", max = COMMENT_TEXT_MAX_LEN)]
    TooLong(usize),
}

/// Non-blank comment body of at most [`COMMENT_TEXT_MAX_LEN`] characters.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct CommentText(String);

impl CommentText {
    pub fn new(text: String) -> Result<Self, InvalidCommentTextError> {
        let len = text.chars().count();

        if text.trim().is_empty() {
            Err(InvalidCommentTextError::Blank)
        } else if len > COMMENT_TEXT_MAX_LEN {
            Err(InvalidCommentTextError::TooLong(len))
        } else {
            Ok(Self(text))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CommentText {
    type Error = InvalidCommentTextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
