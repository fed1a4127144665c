//! Canonical audit record and the closed action / resource taxonomies.
//!
//! Recommended `details` keys per action (not enforced by the type system):
//!
//! | action                    | details                                   |
//! |---------------------------|-------------------------------------------|
//! | `user_created`            | `email`, `role`                           |
//! | `user_role_changed`       | `old_role`, `new_role`                    |
//! | `user_suspended`          | `reason`                                  |
//! | `user_activated`          | `closed_suspensions`                      |
//! | `admin_assigned`          | `role`, `location`                        |
//! | `admin_location_updated`  | `old_location`, `new_location`            |
//! | `order_status_changed`    | `old_status`, `new_status`                |
//! | `product_created`         | `title`, `category`                       |
//! | `failed_login`            | `email`, `attempts`                       |
//! | `system_initialized`      | `store`                                   |

use {
    super::error::ActivityError,
    super::id::{AccountId, RecordId},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    std::fmt,
};

/// Schema-less payload attached to a record.
pub type Details = Map<String, Value>;

/// Placeholder for request attributes that could not be resolved.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserLogin,
    UserLogout,
    UserCreated,
    UserUpdated,
    UserDeleted,
    UserRoleChanged,
    UserSuspended,
    UserActivated,
    PasswordChanged,
    AdminAssigned,
    AdminLocationUpdated,
    AdminPermissionsChanged,
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
    ProductApproved,
    ProductRejected,
    OrderCreated,
    OrderUpdated,
    OrderCancelled,
    OrderCompleted,
    CoverImageUpdated,
    SettingsUpdated,
    DataExported,
    SystemBackup,
    UnauthorizedAccess,
    FailedLogin,
    SuspiciousActivity,
    DataBreachAttempt,
    SystemInitialized,
    UserRegistered,
    OrderPlaced,
    OrderStatusChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCategory {
    User,
    Admin,
    Product,
    Order,
    Content,
    System,
    Security,
}

impl AuditAction {
    pub const ALL: [AuditAction; 33] = [
        Self::UserLogin,
        Self::UserLogout,
        Self::UserCreated,
        Self::UserUpdated,
        Self::UserDeleted,
        Self::UserRoleChanged,
        Self::UserSuspended,
        Self::UserActivated,
        Self::PasswordChanged,
        Self::AdminAssigned,
        Self::AdminLocationUpdated,
        Self::AdminPermissionsChanged,
        Self::ProductCreated,
        Self::ProductUpdated,
        Self::ProductDeleted,
        Self::ProductApproved,
        Self::ProductRejected,
        Self::OrderCreated,
        Self::OrderUpdated,
        Self::OrderCancelled,
        Self::OrderCompleted,
        Self::CoverImageUpdated,
        Self::SettingsUpdated,
        Self::DataExported,
        Self::SystemBackup,
        Self::UnauthorizedAccess,
        Self::FailedLogin,
        Self::SuspiciousActivity,
        Self::DataBreachAttempt,
        Self::SystemInitialized,
        Self::UserRegistered,
        Self::OrderPlaced,
        Self::OrderStatusChanged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserLogin => "user_login",
            Self::UserLogout => "user_logout",
            Self::UserCreated => "user_created",
            Self::UserUpdated => "user_updated",
            Self::UserDeleted => "user_deleted",
            Self::UserRoleChanged => "user_role_changed",
            Self::UserSuspended => "user_suspended",
            Self::UserActivated => "user_activated",
            Self::PasswordChanged => "password_changed",
            Self::AdminAssigned => "admin_assigned",
            Self::AdminLocationUpdated => "admin_location_updated",
            Self::AdminPermissionsChanged => "admin_permissions_changed",
            Self::ProductCreated => "product_created",
            Self::ProductUpdated => "product_updated",
            Self::ProductDeleted => "product_deleted",
            Self::ProductApproved => "product_approved",
            Self::ProductRejected => "product_rejected",
            Self::OrderCreated => "order_created",
            Self::OrderUpdated => "order_updated",
            Self::OrderCancelled => "order_cancelled",
            Self::OrderCompleted => "order_completed",
            Self::CoverImageUpdated => "cover_image_updated",
            Self::SettingsUpdated => "settings_updated",
            Self::DataExported => "data_exported",
            Self::SystemBackup => "system_backup",
            Self::UnauthorizedAccess => "unauthorized_access",
            Self::FailedLogin => "failed_login",
            Self::SuspiciousActivity => "suspicious_activity",
            Self::DataBreachAttempt => "data_breach_attempt",
            Self::SystemInitialized => "system_initialized",
            Self::UserRegistered => "user_registered",
            Self::OrderPlaced => "order_placed",
            Self::OrderStatusChanged => "order_status_changed",
        }
    }

    pub fn category(&self) -> ActionCategory {
        match self {
            Self::UserLogin
            | Self::UserLogout
            | Self::UserCreated
            | Self::UserUpdated
            | Self::UserDeleted
            | Self::UserRoleChanged
            | Self::UserSuspended
            | Self::UserActivated
            | Self::PasswordChanged
            | Self::UserRegistered => ActionCategory::User,
            Self::AdminAssigned | Self::AdminLocationUpdated | Self::AdminPermissionsChanged => {
                ActionCategory::Admin
            }
            Self::ProductCreated
            | Self::ProductUpdated
            | Self::ProductDeleted
            | Self::ProductApproved
            | Self::ProductRejected => ActionCategory::Product,
            Self::OrderCreated
            | Self::OrderUpdated
            | Self::OrderCancelled
            | Self::OrderCompleted
            | Self::OrderPlaced
            | Self::OrderStatusChanged => ActionCategory::Order,
            Self::CoverImageUpdated | Self::SettingsUpdated | Self::DataExported => {
                ActionCategory::Content
            }
            Self::SystemBackup | Self::SystemInitialized => ActionCategory::System,
            Self::UnauthorizedAccess
            | Self::FailedLogin
            | Self::SuspiciousActivity
            | Self::DataBreachAttempt => ActionCategory::Security,
        }
    }

    /// The only place severity is decided. Call sites never pick it.
    pub fn severity(&self) -> Severity {
        match self.category() {
            ActionCategory::Security => Severity::Critical,
            ActionCategory::Admin => Severity::High,
            ActionCategory::User => match self {
                Self::UserDeleted
                | Self::UserRoleChanged
                | Self::UserSuspended
                | Self::UserActivated => Severity::High,
                _ => Severity::Medium,
            },
            ActionCategory::Product | ActionCategory::Order => match self {
                Self::ProductDeleted | Self::ProductRejected | Self::OrderCancelled => {
                    Severity::Medium
                }
                _ => Severity::Low,
            },
            ActionCategory::Content => Severity::Medium,
            ActionCategory::System => Severity::Low,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for AuditAction {
    type Error = ActivityError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ActivityError::Validation(format!("unknown audit action: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    User,
    Admin,
    Product,
    Order,
    Review,
    Feedback,
    CoverImage,
    System,
    Security,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Product => "product",
            Self::Order => "order",
            Self::Review => "review",
            Self::Feedback => "feedback",
            Self::CoverImage => "cover_image",
            Self::System => "system",
            Self::Security => "security",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for ResourceType {
    type Error = ActivityError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "product" => Ok(Self::Product),
            "order" => Ok(Self::Order),
            "review" => Ok(Self::Review),
            "feedback" => Ok(Self::Feedback),
            "cover_image" => Ok(Self::CoverImage),
            "system" => Ok(Self::System),
            "security" => Ok(Self::Security),
            other => Err(ActivityError::Validation(format!(
                "unknown resource type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Severity {
    type Error = ActivityError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(ActivityError::Validation(format!(
                "unknown severity: {other}"
            ))),
        }
    }
}

/// The authenticated account an event is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: AccountId,
    pub name: String,
    pub email: String,
}

impl Actor {
    pub fn new(id: AccountId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Attribution for writes the system performs on its own behalf.
    pub fn system() -> Self {
        Self {
            id: AccountId::system(),
            name: "System".to_string(),
            email: "system@localhost".to_string(),
        }
    }
}

/// Network attributes of the request that triggered an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestOrigin {
    pub fn ip_or_unknown(&self) -> String {
        resolved_or_unknown(self.ip_address.as_deref())
    }

    pub fn user_agent_or_unknown(&self) -> String {
        resolved_or_unknown(self.user_agent.as_deref())
    }
}

fn resolved_or_unknown(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// What happened, independent of who did it and when.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub resource_type: ResourceType,
    pub resource_id: Option<String>,
    pub details: Details,
}

impl AuditEvent {
    pub fn new(action: AuditAction, resource_type: ResourceType) -> Self {
        Self {
            action,
            resource_type,
            resource_id: None,
            details: Details::new(),
        }
    }

    pub fn resource(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Merge a JSON object into the payload. Non-object values land under `value`.
    pub fn details(mut self, value: Value) -> Self {
        match value {
            Value::Object(map) => self.details.extend(map),
            Value::Null => {}
            other => {
                self.details.insert("value".to_string(), other);
            }
        }
        self
    }
}

/// One immutable entry of the activity trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    id: RecordId,
    actor_id: AccountId,
    actor_name: String,
    actor_email: String,
    action: AuditAction,
    resource_type: ResourceType,
    resource_id: Option<String>,
    details: Details,
    ip_address: Option<String>,
    user_agent: Option<String>,
    severity: Severity,
    timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// Build an emitted record. Severity follows the action.
    pub fn new(
        actor: &Actor,
        origin: &RequestOrigin,
        event: AuditEvent,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RecordId::generate(),
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            actor_email: actor.email.clone(),
            severity: event.action.severity(),
            action: event.action,
            resource_type: event.resource_type,
            resource_id: event.resource_id,
            details: event.details,
            ip_address: Some(origin.ip_or_unknown()),
            user_agent: Some(origin.user_agent_or_unknown()),
            timestamp,
        }
    }

    /// Build a record reconstructed from a primary-table row.
    pub fn synthesized(
        source: &str,
        source_id: &str,
        actor: &Actor,
        event: AuditEvent,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RecordId::synthesized(source, source_id),
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            actor_email: actor.email.clone(),
            severity: event.action.severity(),
            action: event.action,
            resource_type: event.resource_type,
            resource_id: event.resource_id,
            details: event.details,
            ip_address: None,
            user_agent: None,
            timestamp,
        }
    }

    /// Rehydrate a persisted record. Stored severity is trusted as written.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: RecordId,
        actor: Actor,
        action: AuditAction,
        resource_type: ResourceType,
        resource_id: Option<String>,
        details: Details,
        ip_address: Option<String>,
        user_agent: Option<String>,
        severity: Severity,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            actor_id: actor.id,
            actor_name: actor.name,
            actor_email: actor.email,
            action,
            resource_type,
            resource_id,
            details,
            ip_address,
            user_agent,
            severity,
            timestamp,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn actor_id(&self) -> &AccountId {
        &self.actor_id
    }

    pub fn actor_name(&self) -> &str {
        &self.actor_name
    }

    pub fn actor_email(&self) -> &str {
        &self.actor_email
    }

    pub fn action(&self) -> AuditAction {
        self.action
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_roundtrip_through_the_taxonomy() {
        for action in AuditAction::ALL {
            assert_eq!(AuditAction::try_from(action.as_str()).unwrap(), action);
        }
        assert!(AuditAction::try_from("user_teleported").is_err());
    }

    #[test]
    fn severity_follows_category() {
        assert_eq!(AuditAction::DataBreachAttempt.severity(), Severity::Critical);
        assert_eq!(AuditAction::FailedLogin.severity(), Severity::Critical);
        assert_eq!(AuditAction::AdminLocationUpdated.severity(), Severity::High);
        assert_eq!(AuditAction::UserCreated.severity(), Severity::Medium);
        assert_eq!(AuditAction::UserRoleChanged.severity(), Severity::High);
        assert_eq!(AuditAction::OrderPlaced.severity(), Severity::Low);
        assert_eq!(AuditAction::OrderCancelled.severity(), Severity::Medium);
    }

    #[test]
    fn unresolved_origin_becomes_unknown() {
        let origin = RequestOrigin {
            ip_address: Some("  ".into()),
            user_agent: None,
        };
        assert_eq!(origin.ip_or_unknown(), UNKNOWN);
        assert_eq!(origin.user_agent_or_unknown(), UNKNOWN);
    }

    #[test]
    fn record_severity_is_not_caller_chosen() {
        let actor = Actor::new(AccountId::new("a1").unwrap(), "Ann", "ann@example.com");
        let event = AuditEvent::new(AuditAction::SuspiciousActivity, ResourceType::Security)
            .detail("note", "burst of requests");
        let record = AuditRecord::new(&actor, &RequestOrigin::default(), event, Utc::now());
        assert_eq!(record.severity(), Severity::Critical);
        assert_eq!(record.ip_address(), Some(UNKNOWN));
        assert_eq!(record.details()["note"], "burst of requests");
    }
}
