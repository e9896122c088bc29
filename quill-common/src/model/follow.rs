use crate::model::{Id, user::UserMarker};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct FollowMarker;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Follow {
    pub id: Id<FollowMarker>,
    /// The follower.
    pub user: Id<UserMarker>,
    /// The followed author.
    pub author: Id<UserMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("User {0} cannot follow themselves")]
pub struct SelfFollowError(pub Id<UserMarker>);

/// A follower/author pair that is allowed to be stored.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct FollowPair {
    user: Id<UserMarker>,
    author: Id<UserMarker>,
}

impl FollowPair {
    pub fn new(user: Id<UserMarker>, author: Id<UserMarker>) -> Result<Self, SelfFollowError> {
        if user == author {
            Err(SelfFollowError(user))
        } else {
            Ok(Self { user, author })
        }
    }

    #[must_use]
    pub fn user(self) -> Id<UserMarker> {
        self.user
    }

    #[must_use]
    pub fn author(self) -> Id<UserMarker> {
        self.author
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        Id,
        follow::{FollowPair, SelfFollowError},
    };

    #[test]
    fn self_follow_is_refused() {
        let me = Id::new(1);
        let them = Id::new(2);

        let pair = FollowPair::new(me, them).unwrap();
        assert_eq!(pair.user(), me);
        assert_eq!(pair.author(), them);

        assert_eq!(FollowPair::new(me, me), Err(SelfFollowError(me)));
    }
}
