use thiserror::Error;
use time::Duration;

/// A strictly positive span of time, used for token lifetimes and cache windows.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn new_unchecked(duration: Duration) -> Self {
        Self::new(duration).expect("Duration was not positive.")
    }

    #[must_use]
    pub fn seconds(seconds: i64) -> Option<Self> {
        Self::new(Duration::seconds(seconds))
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }

    #[must_use]
    pub fn whole_seconds(&self) -> i64 {
        self.0.whole_seconds()
    }

    #[must_use]
    pub fn to_std(&self) -> std::time::Duration {
        // Positive by construction, so the conversion cannot underflow.
        self.0.unsigned_abs()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

#[cfg(test)]
mod tests {
    use crate::util::PositiveDuration;
    use time::Duration;

    #[test]
    fn positive_durations() {
        assert!(PositiveDuration::seconds(0).is_none());
        assert!(PositiveDuration::seconds(-5).is_none());

        let twenty = PositiveDuration::seconds(20).unwrap();
        assert_eq!(twenty.get(), Duration::seconds(20));
        assert_eq!(twenty.whole_seconds(), 20);
        assert_eq!(twenty.to_std(), std::time::Duration::from_secs(20));

        assert!(PositiveDuration::try_from(Duration::ZERO).is_err());
    }
}
