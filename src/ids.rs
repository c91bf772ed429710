use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Per-request trace identifier backed by ULID.
///
/// ULIDs are URL-safe (Crockford base32) and sortable by creation time,
/// which makes correlating envelope trace ids with log lines cheap.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct TraceId(pub ulid::Ulid);

impl TraceId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    pub fn from_ulid(id: ulid::Ulid) -> Self {
        Self(id)
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TraceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TraceId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = ulid::Ulid::from_string(s)?;
        Ok(TraceId(id))
    }
}

impl Serialize for TraceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TraceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<TraceId>()
            .map_err(|_| serde::de::Error::custom("invalid trace id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_ids_are_unique_and_round_trip() {
        let a = TraceId::new();
        let b = TraceId::new();
        assert_ne!(a, b);
        let parsed: TraceId = a.to_string().parse().unwrap();
        assert_eq!(a, parsed);
    }
}
