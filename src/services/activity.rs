use {
    super::{fallback::FallbackReconstructor, provisioning::AuditProvisioner},
    crate::domain::{
        audit::AuditRecord,
        error::ActivityError,
        filter::{AuditLogFilter, Page, PageRequest},
        store::StoreProbe,
    },
    serde::Serialize,
    std::sync::Arc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSource {
    AuditLog,
    Reconstructed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityFeed {
    pub records: Vec<AuditRecord>,
    pub total: u64,
    pub source: FeedSource,
}

impl ActivityFeed {
    fn from_page(page: Page<AuditRecord>, source: FeedSource) -> Self {
        Self {
            records: page.records,
            total: page.total,
            source,
        }
    }
}

/// Reads the activity feed: the audit log when it exists, otherwise a
/// reconstruction from the primary tables. The two are never mixed.
pub struct ActivityService {
    provisioner: Arc<AuditProvisioner>,
    fallback: FallbackReconstructor,
}

impl ActivityService {
    pub fn new(provisioner: Arc<AuditProvisioner>, fallback: FallbackReconstructor) -> Self {
        Self {
            provisioner,
            fallback,
        }
    }

    pub async fn query(
        &self,
        filter: AuditLogFilter,
        page: PageRequest,
    ) -> Result<ActivityFeed, ActivityError> {
        let filter = filter.validated()?;

        match self.source().await {
            StoreProbe::Absent => self.reconstruct(&filter, page).await,
            StoreProbe::Ready => {
                let found = self.provisioner.store().search(&filter, page).await?;
                // An existing but still empty log is treated like a missing one,
                // but only for the unfiltered feed.
                if found.total == 0 && filter.is_empty() {
                    tracing::debug!("audit log is empty, reconstructing feed");
                    return self.reconstruct(&filter, page).await;
                }
                Ok(ActivityFeed::from_page(found, FeedSource::AuditLog))
            }
        }
    }

    async fn source(&self) -> StoreProbe {
        match self.provisioner.probe().await {
            Ok(probe) => probe,
            Err(e) => {
                tracing::warn!(error = %e, "audit store probe failed, using reconstruction");
                StoreProbe::Absent
            }
        }
    }

    async fn reconstruct(
        &self,
        filter: &AuditLogFilter,
        page: PageRequest,
    ) -> Result<ActivityFeed, ActivityError> {
        let page = self.fallback.reconstruct(filter, page).await?;
        Ok(ActivityFeed::from_page(page, FeedSource::Reconstructed))
    }
}
