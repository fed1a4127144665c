use {
    super::emitter::EventEmitter,
    crate::domain::{
        account::AccountStatus,
        audit::{Actor, AuditAction, AuditEvent, RequestOrigin, ResourceType},
        error::ActivityError,
        id::AccountId,
        store::{AccountDirectory, SuspensionStore},
        suspension::{LoginDecision, SuspensionRecord},
    },
    chrono::Utc,
    std::sync::Arc,
};

/// Decides whether an account may establish a session, and records
/// suspensions and reinstatements. The suspension records decide access;
/// `accounts.status` mirrors them for listings.
pub struct SuspensionGate {
    store: Arc<dyn SuspensionStore>,
    directory: Arc<dyn AccountDirectory>,
    emitter: Arc<EventEmitter>,
}

impl SuspensionGate {
    pub fn new(
        store: Arc<dyn SuspensionStore>,
        directory: Arc<dyn AccountDirectory>,
        emitter: Arc<EventEmitter>,
    ) -> Self {
        Self {
            store,
            directory,
            emitter,
        }
    }

    /// Fails open: a lookup error allows the login and carries a warning.
    pub async fn check_login_allowed(&self, user_id: &AccountId) -> LoginDecision {
        match self.store.latest_active(user_id).await {
            Ok(None) => LoginDecision::allowed(),
            Ok(Some(suspension)) => {
                tracing::info!(
                    user_id = %user_id,
                    suspended_at = %suspension.suspended_at,
                    "login blocked by active suspension"
                );
                LoginDecision::blocked(&suspension)
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "suspension check failed, allowing login");
                LoginDecision::failed_open("suspension status could not be verified")
            }
        }
    }

    /// Same gate, run for every session that is established or refreshed.
    pub async fn validate_session(&self, user_id: &AccountId) -> LoginDecision {
        let decision = self.check_login_allowed(user_id).await;
        if !decision.allowed {
            tracing::info!(user_id = %user_id, "session rejected for suspended account");
        }
        decision
    }

    pub async fn suspend(
        &self,
        actor: &Actor,
        origin: &RequestOrigin,
        user_id: &AccountId,
        reason: &str,
    ) -> Result<SuspensionRecord, ActivityError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ActivityError::Validation(
                "a suspension reason is required".into(),
            ));
        }
        if &actor.id == user_id {
            return Err(ActivityError::Validation(
                "an account cannot suspend itself".into(),
            ));
        }

        let record = SuspensionRecord::open(user_id.clone(), reason, actor.id.clone(), Utc::now());
        self.store.insert(&record).await?;
        self.mirror_status(user_id, AccountStatus::Suspended).await;

        self.emitter
            .emit(
                Some(actor),
                origin,
                AuditEvent::new(AuditAction::UserSuspended, ResourceType::User)
                    .resource(user_id.as_str())
                    .detail("reason", reason)
                    .detail("suspension_id", record.id.to_string()),
            )
            .await;
        tracing::info!(user_id = %user_id, suspended_by = %actor.id, "account suspended");
        Ok(record)
    }

    /// Closes every active suspension. Returns how many were closed.
    pub async fn unsuspend(
        &self,
        actor: &Actor,
        origin: &RequestOrigin,
        user_id: &AccountId,
    ) -> Result<u64, ActivityError> {
        let closed = self.store.close_active(user_id).await?;
        if closed == 0 {
            return Err(ActivityError::NotFound {
                entity: "active suspension",
                id: user_id.to_string(),
            });
        }
        self.mirror_status(user_id, AccountStatus::Active).await;

        self.emitter
            .emit(
                Some(actor),
                origin,
                AuditEvent::new(AuditAction::UserActivated, ResourceType::User)
                    .resource(user_id.as_str())
                    .detail("closed_suspensions", closed),
            )
            .await;
        tracing::info!(user_id = %user_id, closed, "account reinstated");
        Ok(closed)
    }

    async fn mirror_status(&self, user_id: &AccountId, status: AccountStatus) {
        match self.directory.set_status(user_id, status).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!(user_id = %user_id, "no account row to update"),
            Err(e) => tracing::warn!(
                user_id = %user_id,
                status = status.as_str(),
                error = %e,
                "failed to update account status"
            ),
        }
    }
}
