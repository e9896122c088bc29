use quill_common::{paginate::Paginator, util::PositiveDuration};
use std::{num::NonZeroU32, path::PathBuf};

pub const DEFAULT_INDEX_CACHE_SECONDS: NonZeroU32 = NonZeroU32::new(20).unwrap();

/// Runtime settings shared by every handler.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Settings {
    /// Page size of every feed.
    pub paginator: Paginator,
    pub index_cache_ttl: PositiveDuration,
    pub media_root: PathBuf,
}

impl Settings {
    #[must_use]
    pub fn new(post_per_page: NonZeroU32, index_cache_seconds: NonZeroU32, media_root: PathBuf) -> Self {
        Self {
            paginator: Paginator::new(post_per_page),
            index_cache_ttl: PositiveDuration::new_unchecked(time::Duration::seconds(i64::from(
                index_cache_seconds.get(),
            ))),
            media_root,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(
            quill_common::paginate::DEFAULT_PAGE_SIZE,
            DEFAULT_INDEX_CACHE_SECONDS,
            PathBuf::from("media"),
        )
    }
}
