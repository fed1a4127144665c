use {
    super::emitter::EventEmitter,
    crate::domain::{
        account::{AccountRole, AdminAccount},
        audit::{Actor, AuditAction, AuditEvent, RequestOrigin, ResourceType},
        error::ActivityError,
        id::AccountId,
        location::LocationScope,
        store::AccountDirectory,
    },
    std::sync::Arc,
};

/// Promotion, relocation and demotion of administrators. Accounts are
/// never deleted here.
pub struct AdminService {
    directory: Arc<dyn AccountDirectory>,
    emitter: Arc<EventEmitter>,
}

impl AdminService {
    pub fn new(directory: Arc<dyn AccountDirectory>, emitter: Arc<EventEmitter>) -> Self {
        Self { directory, emitter }
    }

    /// Grant `admin` or `super_admin`. Only `admin` keeps a location.
    pub async fn promote(
        &self,
        actor: &Actor,
        origin: &RequestOrigin,
        account_id: &AccountId,
        role: AccountRole,
        location: Option<LocationScope>,
    ) -> Result<AdminAccount, ActivityError> {
        if !role.is_admin() {
            return Err(ActivityError::Validation(format!(
                "cannot promote to role {role}"
            )));
        }
        let account = self
            .directory
            .find_account(account_id)
            .await?
            .ok_or_else(|| not_found("account", account_id))?;

        let location = match role {
            AccountRole::Admin => location.filter(|l| !l.is_unrestricted()),
            _ => None,
        };
        self.directory
            .set_role(account_id, role, location.as_ref())
            .await?;

        if account.role != role {
            self.emitter
                .emit(
                    Some(actor),
                    origin,
                    AuditEvent::new(AuditAction::UserRoleChanged, ResourceType::User)
                        .resource(account_id.as_str())
                        .detail("old_role", account.role.as_str())
                        .detail("new_role", role.as_str()),
                )
                .await;
        }
        self.emitter
            .emit(
                Some(actor),
                origin,
                AuditEvent::new(AuditAction::AdminAssigned, ResourceType::Admin)
                    .resource(account_id.as_str())
                    .detail("role", role.as_str())
                    .detail("location", render(location.as_ref())),
            )
            .await;

        tracing::info!(account_id = %account_id, role = %role, "administrator assigned");
        AdminAccount::new(
            account.id,
            account.name,
            account.email,
            role,
            location,
            account.status,
        )
    }

    /// Move a regional admin. `None` or an empty scope makes them global.
    pub async fn reassign_location(
        &self,
        actor: &Actor,
        origin: &RequestOrigin,
        admin_id: &AccountId,
        location: Option<LocationScope>,
    ) -> Result<AdminAccount, ActivityError> {
        let admin = self
            .directory
            .find_admin(admin_id)
            .await?
            .ok_or_else(|| not_found("admin", admin_id))?;
        if admin.role() != AccountRole::Admin {
            return Err(ActivityError::Validation(format!(
                "only role admin carries a location, {admin_id} is {}",
                admin.role()
            )));
        }

        let location = location.filter(|l| !l.is_unrestricted());
        self.directory
            .set_role(admin_id, AccountRole::Admin, location.as_ref())
            .await?;

        self.emitter
            .emit(
                Some(actor),
                origin,
                AuditEvent::new(AuditAction::AdminLocationUpdated, ResourceType::Admin)
                    .resource(admin_id.as_str())
                    .detail("old_location", render(admin.assigned_location()))
                    .detail("new_location", render(location.as_ref())),
            )
            .await;

        AdminAccount::new(
            admin_id.clone(),
            admin.name(),
            admin.email(),
            AccountRole::Admin,
            location,
            admin.status(),
        )
    }

    pub async fn demote(
        &self,
        actor: &Actor,
        origin: &RequestOrigin,
        admin_id: &AccountId,
    ) -> Result<(), ActivityError> {
        let admin = self
            .directory
            .find_admin(admin_id)
            .await?
            .ok_or_else(|| not_found("admin", admin_id))?;
        self.directory
            .set_role(admin_id, AccountRole::User, None)
            .await?;

        self.emitter
            .emit(
                Some(actor),
                origin,
                AuditEvent::new(AuditAction::UserRoleChanged, ResourceType::User)
                    .resource(admin_id.as_str())
                    .detail("old_role", admin.role().as_str())
                    .detail("new_role", AccountRole::User.as_str()),
            )
            .await;
        tracing::info!(admin_id = %admin_id, "administrator demoted");
        Ok(())
    }
}

fn render(location: Option<&LocationScope>) -> String {
    location.cloned().unwrap_or_default().full_display()
}

fn not_found(entity: &'static str, id: &AccountId) -> ActivityError {
    ActivityError::NotFound {
        entity,
        id: id.to_string(),
    }
}
