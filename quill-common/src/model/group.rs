use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

pub const GROUP_TITLE_MAX_LEN: usize = 200;
pub const GROUP_SLUG_MAX_LEN: usize = 30;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct GroupMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Group {
    pub id: Id<GroupMarker>,
    pub title: String,
    pub slug: GroupSlug,
    pub description: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateGroup {
    pub title: String,
    pub slug: GroupSlug,
    pub description: String,
}

impl CreateGroup {
    pub fn new(
        title: String,
        slug: GroupSlug,
        description: String,
    ) -> Result<Self, InvalidGroupTitleError> {
        if title.is_empty() || title.chars().count() > GROUP_TITLE_MAX_LEN {
            return Err(InvalidGroupTitleError(title));
        }

        Ok(Self {
            title,
            slug,
            description,
        })
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The group title is invalid: {0}")]
pub struct InvalidGroupTitleError(String);

/// Url part of a group, unique among groups.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupSlug(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The group slug is invalid: {0}")]
pub struct InvalidGroupSlugError(String);

impl GroupSlug {
    pub fn new(slug: String) -> Result<Self, InvalidGroupSlugError> {
        let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';

        if !slug.is_empty() && slug.len() <= GROUP_SLUG_MAX_LEN && slug.chars().all(allowed) {
            Ok(Self(slug))
        } else {
            Err(InvalidGroupSlugError(slug))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for GroupSlug {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        GroupSlug::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"GroupSlug"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::group::{CreateGroup, GROUP_SLUG_MAX_LEN, GroupSlug};

    #[test]
    fn slugs() {
        assert!(GroupSlug::new("test-slug".to_owned()).is_ok());
        assert!(GroupSlug::new("cats_2".to_owned()).is_ok());
        assert!(GroupSlug::new("s".repeat(GROUP_SLUG_MAX_LEN)).is_ok());

        assert!(GroupSlug::new(String::new()).is_err());
        assert!(GroupSlug::new("s".repeat(GROUP_SLUG_MAX_LEN + 1)).is_err());
        assert!(GroupSlug::new("no spaces".to_owned()).is_err());
        assert!(GroupSlug::new("кошки".to_owned()).is_err());
    }

    #[test]
    fn group_titles() {
        let slug = GroupSlug::new("cats".to_owned()).unwrap();
        assert!(CreateGroup::new("Cats".to_owned(), slug.clone(), String::new()).is_ok());
        assert!(CreateGroup::new(String::new(), slug.clone(), String::new()).is_err());
        assert!(CreateGroup::new("t".repeat(201), slug, String::new()).is_err());
    }
}
