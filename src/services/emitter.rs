use {
    super::provisioning::AuditProvisioner,
    crate::domain::{
        audit::{Actor, AuditEvent, AuditRecord, RequestOrigin},
        id::RecordId,
    },
    chrono::Utc,
    std::sync::Arc,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitOutcome {
    Recorded(RecordId),
    /// No authenticated actor; nothing is written for anonymous context.
    SkippedAnonymous,
    /// The write failed and was logged. The calling operation is unaffected.
    Dropped,
}

/// Single entry point every mutation site uses to append to the audit trail.
pub struct EventEmitter {
    provisioner: Arc<AuditProvisioner>,
}

impl EventEmitter {
    pub fn new(provisioner: Arc<AuditProvisioner>) -> Self {
        Self { provisioner }
    }

    /// Never fails: storage errors are logged and swallowed.
    pub async fn emit(
        &self,
        actor: Option<&Actor>,
        origin: &RequestOrigin,
        event: AuditEvent,
    ) -> EmitOutcome {
        let Some(actor) = actor else {
            tracing::debug!(action = %event.action, "no actor in context, audit event skipped");
            return EmitOutcome::SkippedAnonymous;
        };

        if let Err(e) = self.provisioner.ensure_ready().await {
            tracing::warn!(
                action = %event.action,
                actor_id = %actor.id,
                error = %e,
                "audit store not ready, event dropped"
            );
            return EmitOutcome::Dropped;
        }

        let record = AuditRecord::new(actor, origin, event, Utc::now());
        match self.provisioner.store().append(&record).await {
            Ok(()) => {
                tracing::debug!(
                    record_id = %record.id(),
                    action = %record.action(),
                    severity = %record.severity(),
                    "audit event recorded"
                );
                EmitOutcome::Recorded(record.id().clone())
            }
            Err(e) => {
                tracing::warn!(
                    action = %record.action(),
                    actor_id = %actor.id,
                    error = %e,
                    "failed to persist audit event"
                );
                EmitOutcome::Dropped
            }
        }
    }
}
