//! Submitted forms and their field-level validation.

use crate::server::media::{ImageKind, MediaStore};
use axum::{
    body::Bytes,
    extract::{Multipart, multipart::MultipartError},
};
use quill_common::model::{
    Id,
    comment::{CommentText, InvalidCommentTextError},
    group::{Group, GroupMarker},
    post::{Post, PostContent},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Error messages keyed by field name.
pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// The post form as submitted, or as prefilled from an existing post.
#[derive(Clone, Eq, PartialEq, Debug, Default, Serialize)]
pub struct PostForm {
    pub text: String,
    /// The selected group exactly as submitted.
    pub group: Option<String>,
    /// Name of the uploaded file, or the stored path when editing.
    pub image: Option<String>,
    pub errors: FieldErrors,
    #[serde(skip)]
    upload: Option<Upload>,
}

/// A post form that passed validation.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ValidPost {
    pub text: String,
    pub group: Option<Id<GroupMarker>>,
    pub image: Option<(Upload, ImageKind)>,
}

impl PostForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("text") => form.text = field.text().await?,
                Some("group") => {
                    let group = field.text().await?;
                    form.group = (!group.is_empty()).then_some(group);
                }
                Some("image") => {
                    let file_name = field.file_name().unwrap_or_default().to_owned();
                    let bytes = field.bytes().await?;
                    // Browsers send an empty part when no file was chosen.
                    if !bytes.is_empty() {
                        form.image = Some(file_name.clone());
                        form.upload = Some(Upload { file_name, bytes });
                    }
                }
                other => debug!(field = ?other, "Ignoring unknown form field"),
            }
        }

        Ok(form)
    }

    #[must_use]
    pub fn for_post(post: &Post) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group.as_ref().map(|group| group.id.to_string()),
            image: post.image.clone(),
            ..Self::default()
        }
    }

    /// Checks every field against `groups`, the groups a post may belong to.
    ///
    /// On failure the messages are left in `errors` for the form to be shown again.
    pub fn validate(&mut self, groups: &[Group]) -> Option<ValidPost> {
        self.errors.clear();

        if self.text.trim().is_empty() {
            self.error("text", REQUIRED);
        }

        let group = match self.group.as_deref() {
            None => None,
            Some(raw) => {
                let id = raw.trim().parse::<Id<GroupMarker>>().ok();
                match id.filter(|id| groups.iter().any(|group| group.id == *id)) {
                    Some(id) => Some(id),
                    None => {
                        self.error("group", INVALID_CHOICE);
                        None
                    }
                }
            }
        };

        let image = match self.upload.take() {
            None => None,
            Some(upload) => match ImageKind::detect(&upload.bytes) {
                Some(kind) => Some((upload, kind)),
                None => {
                    debug!(file_name = %upload.file_name, "Upload is not a recognized image");
                    self.error("image", INVALID_IMAGE);
                    None
                }
            },
        };

        if !self.errors.is_empty() {
            return None;
        }

        Some(ValidPost {
            text: self.text.trim().to_owned(),
            group,
            image,
        })
    }

    fn error(&mut self, field: &'static str, message: &str) {
        self.errors.entry(field).or_default().push(message.to_owned());
    }
}

impl ValidPost {
    /// Stores the upload, if any, and produces what gets written to the post.
    ///
    /// Without a new upload the post keeps `current_image`.
    pub async fn into_content(
        self,
        media: &MediaStore,
        current_image: Option<String>,
    ) -> std::io::Result<PostContent> {
        let image = match self.image {
            Some((upload, kind)) => Some(media.save_post_image(&upload.bytes, kind).await?),
            None => current_image,
        };

        Ok(PostContent {
            text: self.text,
            group: self.group,
            image,
        })
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<CommentText, InvalidCommentTextError> {
        CommentText::new(self.text.trim().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use crate::server::{
        forms::{CommentForm, INVALID_CHOICE, INVALID_IMAGE, PostForm, REQUIRED, Upload},
        media::{ImageKind, tests::SMALL_GIF},
    };
    use axum::body::Bytes;
    use quill_common::model::{
        Id,
        group::{Group, GroupSlug},
    };

    fn groups() -> Vec<Group> {
        vec![Group {
            id: Id::new(3),
            title: "Cats".to_owned(),
            slug: GroupSlug::new("cats".to_owned()).unwrap(),
            description: String::new(),
        }]
    }

    fn form(text: &str, group: Option<&str>) -> PostForm {
        PostForm {
            text: text.to_owned(),
            group: group.map(str::to_owned),
            ..PostForm::default()
        }
    }

    #[test]
    fn valid_post() {
        let valid = form("hello", Some("3")).validate(&groups()).unwrap();
        assert_eq!(valid.text, "hello");
        assert_eq!(valid.group, Some(Id::new(3)));
        assert_eq!(valid.image, None);

        let ungrouped = form("hello", None).validate(&groups()).unwrap();
        assert_eq!(ungrouped.group, None);
    }

    #[test]
    fn surrounding_whitespace_is_stripped() {
        let mut padded = form("  \n hello\nworld \t\n", None);
        let valid = padded.validate(&groups()).unwrap();
        assert_eq!(valid.text, "hello\nworld");
    }

    #[test]
    fn blank_text_is_required() {
        let mut blank = form("  \n", None);
        assert!(blank.validate(&groups()).is_none());
        assert_eq!(blank.errors["text"], vec![REQUIRED.to_owned()]);
    }

    #[test]
    fn unknown_group_is_an_invalid_choice() {
        for raw in ["4", "cats", "-1"] {
            let mut unknown = form("hello", Some(raw));
            assert!(unknown.validate(&groups()).is_none());
            assert_eq!(unknown.errors["group"], vec![INVALID_CHOICE.to_owned()]);
            assert!(!unknown.errors.contains_key("text"));
        }
    }

    #[test]
    fn uploads_must_be_images() {
        let mut text_file = form("hello", None);
        text_file.upload = Some(Upload {
            file_name: "notes.txt".to_owned(),
            bytes: Bytes::from_static(b"just some text"),
        });
        assert!(text_file.validate(&groups()).is_none());
        assert_eq!(text_file.errors["image"], vec![INVALID_IMAGE.to_owned()]);

        let mut gif = form("hello", None);
        gif.upload = Some(Upload {
            file_name: "small.gif".to_owned(),
            bytes: Bytes::from_static(SMALL_GIF),
        });
        let (_, kind) = gif.validate(&groups()).unwrap().image.unwrap();
        assert_eq!(kind, ImageKind::Gif);
    }

    #[test]
    fn comments() {
        let ok = CommentForm {
            text: "  nice post ".to_owned(),
        };
        assert_eq!(ok.validate().unwrap().get(), "nice post");

        assert!(CommentForm::default().validate().is_err());
        assert!(
            CommentForm {
                text: "x".repeat(251)
            }
            .validate()
            .is_err()
        );
    }
}
