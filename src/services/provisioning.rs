use {
    crate::domain::{
        audit::{Actor, AuditAction, AuditEvent, AuditRecord, RequestOrigin, ResourceType},
        error::ActivityError,
        store::{AuditStore, StoreProbe},
    },
    chrono::Utc,
    std::sync::{Arc, Mutex},
};

/// Lifecycle of the audit store as seen by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionState {
    Unknown,
    Checked { exists: bool },
    Initializing,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// This call created the store and wrote the seed record.
    Initialized,
    /// The store was already there.
    AlreadyInitialized,
}

impl ProvisionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::AlreadyInitialized => "already_initialized",
        }
    }
}

/// Owns the audit store handle and its create-if-missing setup.
pub struct AuditProvisioner {
    store: Arc<dyn AuditStore>,
    state: Mutex<ProvisionState>,
    init_lock: tokio::sync::Mutex<()>,
}

impl AuditProvisioner {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self {
            store,
            state: Mutex::new(ProvisionState::Unknown),
            init_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn store(&self) -> &dyn AuditStore {
        &*self.store
    }

    pub fn state(&self) -> ProvisionState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(ProvisionState::Unknown)
    }

    fn set_state(&self, next: ProvisionState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    /// Existence check. Once the store is known to be ready the probe is skipped.
    pub async fn probe(&self) -> Result<StoreProbe, ActivityError> {
        if self.state() == ProvisionState::Ready {
            return Ok(StoreProbe::Ready);
        }
        let probe = self.store.probe().await?;
        match (probe, self.state()) {
            (StoreProbe::Ready, _) => self.set_state(ProvisionState::Ready),
            (StoreProbe::Absent, ProvisionState::Initializing) => {}
            (StoreProbe::Absent, _) => self.set_state(ProvisionState::Checked { exists: false }),
        }
        Ok(probe)
    }

    /// Create the store if it is missing and write the `system_initialized`
    /// seed record. Safe to call repeatedly and concurrently.
    pub async fn initialize(
        &self,
        initiated_by: &Actor,
        origin: &RequestOrigin,
    ) -> Result<ProvisionOutcome, ActivityError> {
        let _guard = self.init_lock.lock().await;

        if self.probe().await? == StoreProbe::Ready {
            return Ok(ProvisionOutcome::AlreadyInitialized);
        }

        self.set_state(ProvisionState::Initializing);
        if let Err(e) = self.store.create_schema().await {
            self.set_state(ProvisionState::Checked { exists: false });
            tracing::warn!(error = %e, "audit store initialization failed, reads fall back to reconstruction");
            return Err(e);
        }

        let seed = AuditRecord::new(
            initiated_by,
            origin,
            AuditEvent::new(AuditAction::SystemInitialized, ResourceType::System)
                .detail("store", "audit_logs"),
            Utc::now(),
        );
        if let Err(e) = self.store.append(&seed).await {
            // The relation exists; only the marker is missing.
            tracing::warn!(error = %e, "failed to write audit store seed record");
        }

        self.set_state(ProvisionState::Ready);
        tracing::info!(initiated_by = %initiated_by.id, "audit store initialized");
        Ok(ProvisionOutcome::Initialized)
    }

    /// Lazy path used before the first write.
    pub async fn ensure_ready(&self) -> Result<(), ActivityError> {
        if self.probe().await? == StoreProbe::Ready {
            return Ok(());
        }
        self.initialize(&Actor::system(), &RequestOrigin::default())
            .await
            .map(|_| ())
    }
}
