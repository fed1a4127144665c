use {
    super::provisioning::AuditProvisioner,
    crate::domain::{
        audit::{AuditAction, AuditRecord, Severity},
        error::ActivityError,
        filter::AuditLogFilter,
        store::StoreProbe,
    },
    chrono::{DateTime, NaiveTime, Utc},
    serde::Serialize,
    std::{collections::HashMap, hash::Hash, sync::Arc},
};

pub const DEFAULT_SAMPLE_SIZE: u32 = 1000;
const TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionCount {
    pub action: AuditAction,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorCount {
    pub actor_name: String,
    pub count: u64,
}

/// Totals are exact; the top-5 lists come from the most recent
/// `sample_size` records only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityStats {
    pub total: u64,
    pub today: u64,
    pub critical: u64,
    pub top_actions: Vec<ActionCount>,
    pub top_actors: Vec<ActorCount>,
}

pub struct StatsService {
    provisioner: Arc<AuditProvisioner>,
    sample_size: u32,
}

impl StatsService {
    pub fn new(provisioner: Arc<AuditProvisioner>, sample_size: u32) -> Self {
        Self {
            provisioner,
            sample_size: sample_size.max(1),
        }
    }

    pub async fn stats(&self) -> ActivityStats {
        self.stats_at(Utc::now()).await
    }

    /// Never fails; an absent or broken store yields zeros.
    pub async fn stats_at(&self, now: DateTime<Utc>) -> ActivityStats {
        match self.provisioner.probe().await {
            Ok(StoreProbe::Ready) => {}
            Ok(StoreProbe::Absent) => return ActivityStats::default(),
            Err(e) => {
                tracing::warn!(error = %e, "audit store probe failed, returning empty stats");
                return ActivityStats::default();
            }
        }

        match self.collect(now).await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(error = %e, "failed to compute activity stats");
                ActivityStats::default()
            }
        }
    }

    async fn collect(&self, now: DateTime<Utc>) -> Result<ActivityStats, ActivityError> {
        let store = self.provisioner.store();
        let all = AuditLogFilter::default();
        let today = AuditLogFilter {
            start_date: Some(start_of_day(now)),
            ..Default::default()
        };
        let critical = AuditLogFilter {
            severity: Some(Severity::Critical),
            ..Default::default()
        };

        let (total, today, critical, sample) = tokio::try_join!(
            store.count(&all),
            store.count(&today),
            store.count(&critical),
            store.recent(self.sample_size),
        )?;

        Ok(ActivityStats {
            total,
            today,
            critical,
            top_actions: top_n(sample.iter().map(AuditRecord::action))
                .into_iter()
                .map(|(action, count)| ActionCount { action, count })
                .collect(),
            top_actors: top_n(sample.iter().map(|r| r.actor_name().to_string()))
                .into_iter()
                .map(|(actor_name, count)| ActorCount { actor_name, count })
                .collect(),
        })
    }
}

pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Highest counts first; equal counts ordered by key.
fn top_n<K: Eq + Hash + Ord>(keys: impl Iterator<Item = K>) -> Vec<(K, u64)> {
    let mut counts: HashMap<K, u64> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    let mut ranked: Vec<(K, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_N);
    ranked
}
