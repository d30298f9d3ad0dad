use serde::{Deserialize, Serialize};

/// Opaque trip identifier supplied by the trip store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(String);

impl TripId {
    pub fn new(id: impl Into<String>) -> Self {
        TripId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TripId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TripId {
    fn from(s: String) -> Self {
        TripId(s)
    }
}

impl From<&str> for TripId {
    fn from(s: &str) -> Self {
        TripId::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::TripId;

    #[test]
    fn serializes_as_plain_string() {
        let id = TripId::new("tokyo-2023");
        assert_eq!(serde_json::to_string(&id).expect("json"), "\"tokyo-2023\"");
        assert_eq!(id.to_string(), "tokyo-2023");
    }
}
