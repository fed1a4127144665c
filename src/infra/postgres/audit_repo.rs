use {
    super::{codes, db_error_code},
    crate::domain::{
        audit::{Actor, AuditAction, AuditRecord, Details, ResourceType, Severity},
        error::ActivityError,
        filter::{AuditLogFilter, Page, PageRequest, like_pattern},
        id::{AccountId, RecordId},
        store::{AuditStore, StoreFuture, StoreProbe},
    },
    chrono::{DateTime, Utc},
    sqlx::{PgPool, Postgres, QueryBuilder},
};

/// Applied by `create_schema`, or by an operator when the service role
/// lacks CREATE privilege.
pub const AUDIT_LOG_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS audit_logs (
    id            TEXT PRIMARY KEY,
    actor_id      TEXT NOT NULL,
    actor_name    TEXT NOT NULL,
    actor_email   TEXT NOT NULL,
    action        TEXT NOT NULL,
    resource_type TEXT NOT NULL,
    resource_id   TEXT,
    details       JSONB NOT NULL DEFAULT '{}'::jsonb,
    ip_address    TEXT,
    user_agent    TEXT,
    severity      TEXT NOT NULL CHECK (severity IN ('low', 'medium', 'high', 'critical')),
    timestamp     TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS audit_logs_timestamp_idx ON audit_logs (timestamp DESC);
CREATE INDEX IF NOT EXISTS audit_logs_actor_id_idx ON audit_logs (actor_id);
CREATE INDEX IF NOT EXISTS audit_logs_action_idx ON audit_logs (action);
CREATE INDEX IF NOT EXISTS audit_logs_severity_idx ON audit_logs (severity);
"#;

const SELECT_COLUMNS: &str = "SELECT id, actor_id, actor_name, actor_email, action, resource_type, \
     resource_id, details, ip_address, user_agent, severity, timestamp FROM audit_logs WHERE TRUE";

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: String,
    actor_id: String,
    actor_name: String,
    actor_email: String,
    action: String,
    resource_type: String,
    resource_id: Option<String>,
    details: serde_json::Value,
    ip_address: Option<String>,
    user_agent: Option<String>,
    severity: String,
    timestamp: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditRecord {
    type Error = ActivityError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let details = match row.details {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => Details::new(),
            other => {
                let mut map = Details::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Ok(AuditRecord::from_parts(
            RecordId::from_stored(row.id),
            Actor::new(AccountId::new(row.actor_id)?, row.actor_name, row.actor_email),
            AuditAction::try_from(row.action.as_str())?,
            ResourceType::try_from(row.resource_type.as_str())?,
            row.resource_id,
            details,
            row.ip_address,
            row.user_agent,
            Severity::try_from(row.severity.as_str())?,
            row.timestamp,
        ))
    }
}

pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn probe_inner(&self) -> Result<StoreProbe, ActivityError> {
        match sqlx::query("SELECT 1 FROM audit_logs LIMIT 1")
            .fetch_optional(&self.pool)
            .await
        {
            Ok(_) => Ok(StoreProbe::Ready),
            Err(e) if db_error_code(&e).as_deref() == Some(codes::UNDEFINED_TABLE) => {
                Ok(StoreProbe::Absent)
            }
            Err(e) => Err(ActivityError::StoreUnavailable(e.to_string())),
        }
    }

    async fn create_schema_inner(&self) -> Result<(), ActivityError> {
        match sqlx::raw_sql(AUDIT_LOG_DDL).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(e) => match db_error_code(&e).as_deref() {
                // A concurrent CREATE ... IF NOT EXISTS can still trip these.
                Some(codes::DUPLICATE_TABLE)
                | Some(codes::DUPLICATE_OBJECT)
                | Some(codes::UNIQUE_VIOLATION) => {
                    tracing::debug!(error = %e, "audit_logs created concurrently, treating as success");
                    Ok(())
                }
                Some(codes::INSUFFICIENT_PRIVILEGE) => Err(ActivityError::SetupRequired {
                    reason: e.to_string(),
                    script: AUDIT_LOG_DDL.trim().to_string(),
                }),
                _ => Err(e.into()),
            },
        }
    }

    async fn append_inner(&self, record: &AuditRecord) -> Result<(), ActivityError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (id, actor_id, actor_name, actor_email, action, resource_type,
                 resource_id, details, ip_address, user_agent, severity, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(record.id().as_str())
        .bind(record.actor_id().as_str())
        .bind(record.actor_name())
        .bind(record.actor_email())
        .bind(record.action().as_str())
        .bind(record.resource_type().as_str())
        .bind(record.resource_id())
        .bind(serde_json::Value::Object(record.details().clone()))
        .bind(record.ip_address())
        .bind(record.user_agent())
        .bind(record.severity().as_str())
        .bind(record.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn search_inner(
        &self,
        filter: &AuditLogFilter,
        page: PageRequest,
    ) -> Result<Page<AuditRecord>, ActivityError> {
        let total = self.count_inner(filter).await?;

        let mut qb = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY timestamp DESC, id DESC LIMIT ")
            .push_bind(to_i64(page.limit()))
            .push(" OFFSET ")
            .push_bind(to_i64(page.offset()));

        let rows = qb.build_query_as::<AuditRow>().fetch_all(&self.pool).await?;
        let records = rows
            .into_iter()
            .map(AuditRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page { records, total })
    }

    async fn count_inner(&self, filter: &AuditLogFilter) -> Result<u64, ActivityError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM audit_logs WHERE TRUE");
        push_filter(&mut qb, filter);
        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn recent_inner(&self, limit: u32) -> Result<Vec<AuditRecord>, ActivityError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        qb.push(" ORDER BY timestamp DESC, id DESC LIMIT ")
            .push_bind(i64::from(limit));
        let rows = qb.build_query_as::<AuditRow>().fetch_all(&self.pool).await?;
        rows.into_iter().map(AuditRecord::try_from).collect()
    }
}

/// Append one `AND` clause per present filter field. Must agree with
/// `AuditLogFilter::matches`.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &AuditLogFilter) {
    if let Some(actor_id) = &filter.actor_id {
        qb.push(" AND actor_id = ")
            .push_bind(actor_id.as_str().to_string());
    }
    if let Some(action) = filter.action {
        qb.push(" AND action = ").push_bind(action.as_str());
    }
    if let Some(resource_type) = filter.resource_type {
        qb.push(" AND resource_type = ")
            .push_bind(resource_type.as_str());
    }
    if let Some(severity) = filter.severity {
        qb.push(" AND severity = ").push_bind(severity.as_str());
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND timestamp >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND timestamp <= ").push_bind(end);
    }
    if let Some(term) = &filter.search_term {
        let pattern = like_pattern(term);
        // Same per-entry rule as AuditLogFilter::matches.
        qb.push(" AND (action ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR actor_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM jsonb_each(details) AS d(key, value) WHERE d.key ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR (jsonb_typeof(d.value) IN ('string', 'number', 'boolean') AND d.value #>> '{}' ILIKE ")
            .push_bind(pattern)
            .push(")))");
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl AuditStore for PgAuditStore {
    fn probe(&self) -> StoreFuture<'_, StoreProbe> {
        Box::pin(self.probe_inner())
    }

    fn create_schema(&self) -> StoreFuture<'_, ()> {
        Box::pin(self.create_schema_inner())
    }

    fn append<'a>(&'a self, record: &'a AuditRecord) -> StoreFuture<'a, ()> {
        Box::pin(self.append_inner(record))
    }

    fn search<'a>(
        &'a self,
        filter: &'a AuditLogFilter,
        page: PageRequest,
    ) -> StoreFuture<'a, Page<AuditRecord>> {
        Box::pin(self.search_inner(filter, page))
    }

    fn count<'a>(&'a self, filter: &'a AuditLogFilter) -> StoreFuture<'a, u64> {
        Box::pin(self.count_inner(filter))
    }

    fn recent(&self, limit: u32) -> StoreFuture<'_, Vec<AuditRecord>> {
        Box::pin(self.recent_inner(limit))
    }
}
