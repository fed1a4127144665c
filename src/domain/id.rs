use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::error::ActivityError;

/// Account identifier as issued by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Result<Self, ActivityError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ActivityError::Validation(
                "AccountId must not be empty".into(),
            ));
        }
        Ok(Self(id))
    }

    /// Reserved id for writes the system performs itself.
    pub fn system() -> Self {
        Self("system".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Audit record identifier. Emitted records carry a UUIDv7; records
/// reconstructed from primary tables carry `{source}_{source_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Deterministic id for a reconstructed record: same row, same id.
    pub fn synthesized(source: &str, source_id: &str) -> Self {
        Self(format!("{source}_{source_id}"))
    }

    pub fn from_stored(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_ids_are_stable() {
        let a = RecordId::synthesized("order", "42");
        let b = RecordId::synthesized("order", "42");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "order_42");
    }

    #[test]
    fn blank_account_id_is_rejected() {
        assert!(AccountId::new("  ").is_err());
        assert_eq!(AccountId::new("u_1").unwrap().as_str(), "u_1");
    }
}
