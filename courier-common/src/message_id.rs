//! `MessageId`: the scheduler's primary key.
//!
//! A `MessageId` is a ULID: 48 bits of millisecond UNIX timestamp followed by
//! 80 bits of entropy, lexicographically sortable in the same order as the
//! encoded timestamp. The timestamp encoded here is the scheduled delivery
//! instant, not the instant the message was submitted.

use std::time::{Duration, SystemTime};

/// Globally unique, time-sortable identifier for a scheduled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(ulid::Ulid);

impl MessageId {
    /// Generate an id whose encoded timestamp is `now + delay`.
    #[must_use]
    pub fn generate_at(delay: Duration) -> Self {
        let due = SystemTime::now() + delay;
        let millis = due
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64);
        Self(ulid::Ulid::from_parts(millis, ulid::Ulid::new().random()))
    }

    /// Wrap an existing ULID.
    #[must_use]
    pub const fn from_ulid(id: ulid::Ulid) -> Self {
        Self(id)
    }

    /// The underlying ULID.
    #[must_use]
    pub const fn ulid(&self) -> ulid::Ulid {
        self.0
    }

    /// Scheduled delivery instant, milliseconds since the Unix epoch.
    #[must_use]
    pub const fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }

    /// 16-byte big-endian binary form, used as the `courier-store` key.
    #[must_use]
    pub fn to_bytes(self) -> [u8; 16] {
        self.0.to_bytes()
    }

    /// Parse from the 16-byte binary form produced by [`Self::to_bytes`].
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(ulid::Ulid::from_bytes(bytes))
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MessageId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(Self)
    }
}

impl serde::Serialize for MessageId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for MessageId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ulid::Ulid::from_string(&s)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_bytes() {
        let id = MessageId::generate_at(Duration::from_secs(5));
        let bytes = id.to_bytes();
        assert_eq!(MessageId::from_bytes(bytes), id);
    }

    #[test]
    fn roundtrips_through_display_and_parse() {
        let id = MessageId::generate_at(Duration::ZERO);
        let text = id.to_string();
        assert_eq!(text.parse::<MessageId>().unwrap(), id);
    }

    #[test]
    fn later_delay_sorts_after_earlier_delay() {
        let earlier = MessageId::generate_at(Duration::from_millis(10));
        let later = MessageId::generate_at(Duration::from_millis(500));
        assert!(earlier < later);
        assert!(earlier.timestamp_ms() <= later.timestamp_ms());
    }

    #[test]
    fn json_roundtrip_is_a_string() {
        let id = MessageId::generate_at(Duration::from_secs(1));
        let json = serde_json::to_string(&id).unwrap();
        assert!(json.starts_with('"'));
        let back: MessageId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
