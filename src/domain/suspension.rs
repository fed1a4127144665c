use {
    super::id::AccountId,
    chrono::{DateTime, Utc},
    serde::Serialize,
    uuid::Uuid,
};

/// One suspension episode. Closed by flipping `is_active`, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuspensionRecord {
    pub id: Uuid,
    pub user_id: AccountId,
    pub is_active: bool,
    pub reason: String,
    pub suspended_by: AccountId,
    pub suspended_at: DateTime<Utc>,
}

impl SuspensionRecord {
    pub fn open(
        user_id: AccountId,
        reason: impl Into<String>,
        suspended_by: AccountId,
        suspended_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            is_active: true,
            reason: reason.into(),
            suspended_by,
            suspended_at,
        }
    }

    /// Message shown to a blocked account.
    pub fn block_reason(&self) -> String {
        format!(
            "Account suspended on {}. Reason: {}",
            self.suspended_at.format("%Y-%m-%d"),
            self.reason
        )
    }
}

/// Outcome of the suspension gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Set when the check itself could not run and access was granted anyway.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl LoginDecision {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            warning: None,
        }
    }

    pub fn blocked(suspension: &SuspensionRecord) -> Self {
        Self {
            allowed: false,
            reason: Some(suspension.block_reason()),
            warning: None,
        }
    }

    pub fn failed_open(warning: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: None,
            warning: Some(warning.into()),
        }
    }
}
