pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {
    config::{AppConfig, Tuning},
    domain::store::{AccountDirectory, AuditStore, MarketplaceTables, SuspensionStore},
    infra::postgres::{
        account_repo::PgAccountDirectory, audit_repo::PgAuditStore,
        marketplace_repo::PgMarketplaceTables, suspension_repo::PgSuspensionStore,
    },
    services::{
        access_scope::AccessScopeResolver, activity::ActivityService, admin::AdminService,
        emitter::EventEmitter, fallback::FallbackReconstructor, provisioning::AuditProvisioner,
        stats::StatsService, suspension_gate::SuspensionGate,
    },
    std::sync::Arc,
};

/// Storage implementations the services run against.
#[derive(Clone)]
pub struct Backends {
    pub audit: Arc<dyn AuditStore>,
    pub tables: Arc<dyn MarketplaceTables>,
    pub directory: Arc<dyn AccountDirectory>,
    pub suspensions: Arc<dyn SuspensionStore>,
}

impl Backends {
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            audit: Arc::new(PgAuditStore::new(pool.clone())),
            tables: Arc::new(PgMarketplaceTables::new(pool.clone())),
            directory: Arc::new(PgAccountDirectory::new(pool.clone())),
            suspensions: Arc::new(PgSuspensionStore::new(pool)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub provisioner: Arc<AuditProvisioner>,
    pub emitter: Arc<EventEmitter>,
    pub activity: Arc<ActivityService>,
    pub stats: Arc<StatsService>,
    pub access: Arc<AccessScopeResolver>,
    pub gate: Arc<SuspensionGate>,
    pub admin: Arc<AdminService>,
}

impl AppState {
    pub fn new(backends: Backends, tuning: Tuning) -> Self {
        let provisioner = Arc::new(AuditProvisioner::new(backends.audit));
        let emitter = Arc::new(EventEmitter::new(provisioner.clone()));
        let fallback = FallbackReconstructor::new(backends.tables, tuning.fallback_window);

        Self {
            activity: Arc::new(ActivityService::new(provisioner.clone(), fallback)),
            stats: Arc::new(StatsService::new(
                provisioner.clone(),
                tuning.stats_sample_size,
            )),
            access: Arc::new(AccessScopeResolver::new(backends.directory.clone())),
            gate: Arc::new(SuspensionGate::new(
                backends.suspensions,
                backends.directory.clone(),
                emitter.clone(),
            )),
            admin: Arc::new(AdminService::new(backends.directory, emitter.clone())),
            provisioner,
            emitter,
        }
    }

    pub fn postgres(pool: sqlx::PgPool, config: &AppConfig) -> Self {
        Self::new(Backends::postgres(pool), config.tuning)
    }
}
