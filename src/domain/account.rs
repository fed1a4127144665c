use {
    super::error::ActivityError,
    super::id::AccountId,
    super::location::{AccountLocation, LocationScope},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    User,
    Admin,
    SuperAdmin,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for AccountRole {
    type Error = ActivityError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(ActivityError::Validation(format!(
                "unknown account role: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Suspended,
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Inactive => "inactive",
        }
    }
}

impl TryFrom<&str> for AccountStatus {
    type Error = ActivityError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            "inactive" => Ok(Self::Inactive),
            other => Err(ActivityError::Validation(format!(
                "unknown account status: {other}"
            ))),
        }
    }
}

/// Any account as listed to an administrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub role: AccountRole,
    pub status: AccountStatus,
    pub location: AccountLocation,
    pub created_at: DateTime<Utc>,
}

/// An account holding an administrative role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminAccount {
    id: AccountId,
    name: String,
    email: String,
    role: AccountRole,
    assigned_location: Option<LocationScope>,
    status: AccountStatus,
}

impl AdminAccount {
    /// Enforces the role/location invariant: only `admin` carries a location,
    /// and an empty location is the same as none.
    pub fn new(
        id: AccountId,
        name: impl Into<String>,
        email: impl Into<String>,
        role: AccountRole,
        assigned_location: Option<LocationScope>,
        status: AccountStatus,
    ) -> Result<Self, ActivityError> {
        if !role.is_admin() {
            return Err(ActivityError::Validation(format!(
                "account {id} is not an administrator"
            )));
        }
        let assigned_location = match role {
            AccountRole::Admin => assigned_location.filter(|l| !l.is_unrestricted()),
            _ => None,
        };
        Ok(Self {
            id,
            name: name.into(),
            email: email.into(),
            role,
            assigned_location,
            status,
        })
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> AccountRole {
        self.role
    }

    pub fn assigned_location(&self) -> Option<&LocationScope> {
        self.assigned_location.as_ref()
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn scope(&self) -> AccessScope {
        match &self.assigned_location {
            Some(location) => AccessScope::Restricted(location.clone()),
            None => AccessScope::Global,
        }
    }
}

/// Resolved administrative reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    Global,
    Restricted(LocationScope),
}

/// Which accounts an administrator may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// No location restriction; callers skip filtering.
    All,
    /// Exactly these accounts. Empty means nothing is visible.
    Only(Vec<AccountId>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    #[test]
    fn super_admin_never_carries_a_location() {
        let admin = AdminAccount::new(
            id("sa"),
            "Root",
            "root@example.com",
            AccountRole::SuperAdmin,
            Some(LocationScope::city("Toronto")),
            AccountStatus::Active,
        )
        .unwrap();
        assert!(admin.assigned_location().is_none());
        assert_eq!(admin.scope(), AccessScope::Global);
    }

    #[test]
    fn plain_users_are_not_admins() {
        let err = AdminAccount::new(
            id("u"),
            "U",
            "u@example.com",
            AccountRole::User,
            None,
            AccountStatus::Active,
        );
        assert!(matches!(err, Err(ActivityError::Validation(_))));
    }

    #[test]
    fn empty_location_means_global() {
        let admin = AdminAccount::new(
            id("a"),
            "A",
            "a@example.com",
            AccountRole::Admin,
            Some(LocationScope::default()),
            AccountStatus::Active,
        )
        .unwrap();
        assert_eq!(admin.scope(), AccessScope::Global);
    }
}
