use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::SystemTime;

/// A Unix timestamp in milliseconds, used for the payment freshness window.
///
/// Payment payloads carry the moment the client signed the transaction.
/// The wire format serializes this as a plain JSON integer, not a string,
/// to match what client SDKs emit from `Date.now()`-style clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixTimestampMillis(u64);

impl UnixTimestampMillis {
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("SystemTime before UNIX epoch?!?")
            .as_millis() as u64;
        Self(now)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Milliseconds elapsed between this timestamp and `now`.
    ///
    /// A timestamp from the future counts as zero age rather than wrapping.
    pub fn age(&self, now: UnixTimestampMillis) -> u64 {
        now.0.saturating_sub(self.0)
    }
}

impl Display for UnixTimestampMillis {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_integer() {
        let ts = UnixTimestampMillis::from_millis(1_700_000_000_000);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "1700000000000");
    }

    #[test]
    fn deserializes_from_integer() {
        let ts: UnixTimestampMillis = serde_json::from_str("1700000000000").unwrap();
        assert_eq!(ts.as_millis(), 1_700_000_000_000);
    }

    #[test]
    fn rejects_string_timestamps() {
        assert!(serde_json::from_str::<UnixTimestampMillis>("\"1700000000000\"").is_err());
    }

    #[test]
    fn future_timestamps_have_zero_age() {
        let now = UnixTimestampMillis::from_millis(1_000);
        let future = UnixTimestampMillis::from_millis(2_000);
        assert_eq!(future.age(now), 0);
    }
}
