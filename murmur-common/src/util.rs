use serde::{
    Deserialize, Deserializer,
    de::{Error as _, Unexpected},
};
use thiserror::Error;
use time::Duration;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
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
    pub fn from_millis(millis: u64) -> Option<Self> {
        Self::new(Duration::milliseconds(i64::try_from(millis).ok()?))
    }

    #[must_use]
    pub fn get(self) -> Duration {
        self.0
    }

    /// The same span as a [`std::time::Duration`], for timers.
    #[must_use]
    pub fn as_std(self) -> std::time::Duration {
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

// Configuration spells durations as whole milliseconds.
impl<'de> Deserialize<'de> for PositiveDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Self::from_millis(millis).ok_or_else(|| {
            D::Error::invalid_value(Unexpected::Unsigned(millis), &"a positive number of milliseconds")
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::util::PositiveDuration;
    use time::Duration;

    #[test]
    fn rejects_non_positive() {
        assert!(PositiveDuration::new(Duration::ZERO).is_none());
        assert!(PositiveDuration::new(Duration::milliseconds(-5)).is_none());
        assert!(PositiveDuration::from_millis(0).is_none());
        assert!(PositiveDuration::try_from(Duration::seconds(-1)).is_err());
    }

    #[test]
    fn converts_to_std() {
        let duration = PositiveDuration::from_millis(1500).unwrap();
        assert_eq!(duration.get(), Duration::milliseconds(1500));
        assert_eq!(duration.as_std(), std::time::Duration::from_millis(1500));
    }

    #[test]
    fn deserializes_from_millis() {
        let duration: PositiveDuration = serde_json::from_str("250").unwrap();
        assert_eq!(duration.as_std(), std::time::Duration::from_millis(250));
        assert!(serde_json::from_str::<PositiveDuration>("0").is_err());
    }
}
