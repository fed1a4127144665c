use {
    crate::domain::{
        error::ActivityError,
        id::AccountId,
        store::{StoreFuture, SuspensionStore},
        suspension::SuspensionRecord,
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct SuspensionRow {
    id: Uuid,
    user_id: String,
    is_active: bool,
    reason: String,
    suspended_by: String,
    suspended_at: DateTime<Utc>,
}

impl TryFrom<SuspensionRow> for SuspensionRecord {
    type Error = ActivityError;

    fn try_from(row: SuspensionRow) -> Result<Self, Self::Error> {
        Ok(SuspensionRecord {
            id: row.id,
            user_id: AccountId::new(row.user_id)?,
            is_active: row.is_active,
            reason: row.reason,
            suspended_by: AccountId::new(row.suspended_by)?,
            suspended_at: row.suspended_at,
        })
    }
}

pub struct PgSuspensionStore {
    pool: PgPool,
}

impl PgSuspensionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn latest_active_inner(
        &self,
        user_id: &AccountId,
    ) -> Result<Option<SuspensionRecord>, ActivityError> {
        sqlx::query_as::<_, SuspensionRow>(
            r#"
            SELECT id, user_id, is_active, reason, suspended_by, suspended_at
            FROM account_suspensions
            WHERE user_id = $1 AND is_active
            ORDER BY suspended_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(SuspensionRecord::try_from)
        .transpose()
    }

    async fn insert_inner(&self, record: &SuspensionRecord) -> Result<(), ActivityError> {
        sqlx::query(
            r#"
            INSERT INTO account_suspensions (id, user_id, is_active, reason, suspended_by, suspended_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id.as_str())
        .bind(record.is_active)
        .bind(&record.reason)
        .bind(record.suspended_by.as_str())
        .bind(record.suspended_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn close_active_inner(&self, user_id: &AccountId) -> Result<u64, ActivityError> {
        let result = sqlx::query(
            "UPDATE account_suspensions SET is_active = false, lifted_at = now() WHERE user_id = $1 AND is_active",
        )
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

impl SuspensionStore for PgSuspensionStore {
    fn latest_active<'a>(
        &'a self,
        user_id: &'a AccountId,
    ) -> StoreFuture<'a, Option<SuspensionRecord>> {
        Box::pin(self.latest_active_inner(user_id))
    }

    fn insert<'a>(&'a self, record: &'a SuspensionRecord) -> StoreFuture<'a, ()> {
        Box::pin(self.insert_inner(record))
    }

    fn close_active<'a>(&'a self, user_id: &'a AccountId) -> StoreFuture<'a, u64> {
        Box::pin(self.close_active_inner(user_id))
    }
}
