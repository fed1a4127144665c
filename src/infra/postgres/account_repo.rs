use {
    crate::domain::{
        account::{AccountRole, AccountStatus, AccountSummary, AdminAccount},
        error::ActivityError,
        filter::{Page, PageRequest, like_pattern},
        id::AccountId,
        location::{AccountLocation, LocationPredicate, LocationScope},
        store::{AccountDirectory, StoreFuture},
    },
    chrono::{DateTime, Utc},
    sqlx::{PgPool, Postgres, QueryBuilder},
};

#[derive(sqlx::FromRow)]
struct AccountSummaryRow {
    id: String,
    name: String,
    email: String,
    role: String,
    status: String,
    country: Option<String>,
    city: Option<String>,
    district: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountSummaryRow> for AccountSummary {
    type Error = ActivityError;

    fn try_from(row: AccountSummaryRow) -> Result<Self, Self::Error> {
        Ok(AccountSummary {
            id: AccountId::new(row.id)?,
            name: row.name,
            email: row.email,
            role: AccountRole::try_from(row.role.as_str())?,
            status: AccountStatus::try_from(row.status.as_str())?,
            location: AccountLocation {
                country: row.country,
                city: row.city,
                district: row.district,
            },
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AdminRow {
    id: String,
    name: String,
    email: String,
    role: String,
    status: String,
    assigned_location: Option<serde_json::Value>,
}

impl TryFrom<AdminRow> for AdminAccount {
    type Error = ActivityError;

    fn try_from(row: AdminRow) -> Result<Self, Self::Error> {
        // Stored JSON may use the legacy `state` key; from_stored renames it.
        let location = row
            .assigned_location
            .filter(|v| !v.is_null())
            .map(LocationScope::from_stored)
            .transpose()?;
        AdminAccount::new(
            AccountId::new(row.id)?,
            row.name,
            row.email,
            AccountRole::try_from(row.role.as_str())?,
            location,
            AccountStatus::try_from(row.status.as_str())?,
        )
    }
}

const SUMMARY_COLUMNS: &str = "SELECT id, name, email, role, status, country, city, district, \
     created_at FROM accounts WHERE TRUE";

pub struct PgAccountDirectory {
    pool: PgPool,
}

impl PgAccountDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_account_inner(
        &self,
        id: &AccountId,
    ) -> Result<Option<AccountSummary>, ActivityError> {
        let mut qb = QueryBuilder::<Postgres>::new(SUMMARY_COLUMNS);
        qb.push(" AND id = ").push_bind(id.as_str().to_string());
        qb.build_query_as::<AccountSummaryRow>()
            .fetch_optional(&self.pool)
            .await?
            .map(AccountSummary::try_from)
            .transpose()
    }

    async fn find_admin_inner(&self, id: &AccountId) -> Result<Option<AdminAccount>, ActivityError> {
        sqlx::query_as::<_, AdminRow>(
            r#"
            SELECT id, name, email, role, status, assigned_location
            FROM accounts
            WHERE id = $1 AND role IN ('admin', 'super_admin')
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(AdminAccount::try_from)
        .transpose()
    }

    async fn ids_matching_inner(
        &self,
        predicate: &LocationPredicate,
    ) -> Result<Vec<AccountId>, ActivityError> {
        if predicate.is_unconstrained() {
            return Err(ActivityError::Validation(
                "location predicate has no enforceable clause".into(),
            ));
        }
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM accounts WHERE TRUE");
        for clause in &predicate.clauses {
            qb.push(format!(" AND {} ILIKE ", clause.field.column()))
                .push_bind(like_pattern(&clause.needle));
        }
        qb.push(" ORDER BY id");
        let ids = qb
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?;
        ids.into_iter().map(AccountId::new).collect()
    }

    async fn list_inner(
        &self,
        only: Option<&[AccountId]>,
        page: PageRequest,
    ) -> Result<Page<AccountSummary>, ActivityError> {
        let only: Option<Vec<String>> =
            only.map(|ids| ids.iter().map(|id| id.as_str().to_string()).collect());

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM accounts WHERE TRUE");
        if let Some(ids) = &only {
            count.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
        }
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new(SUMMARY_COLUMNS);
        if let Some(ids) = only {
            qb.push(" AND id = ANY(").push_bind(ids).push(")");
        }
        qb.push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(i64::try_from(page.limit()).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
        let records = qb
            .build_query_as::<AccountSummaryRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AccountSummary::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            records,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn set_role_inner(
        &self,
        id: &AccountId,
        role: AccountRole,
        location: Option<&LocationScope>,
    ) -> Result<(), ActivityError> {
        let location = location.map(serde_json::to_value).transpose()?;
        let result = sqlx::query(
            "UPDATE accounts SET role = $1, assigned_location = $2, updated_at = now() WHERE id = $3",
        )
        .bind(role.as_str())
        .bind(location)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ActivityError::NotFound {
                entity: "account",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn set_status_inner(
        &self,
        id: &AccountId,
        status: AccountStatus,
    ) -> Result<bool, ActivityError> {
        let result =
            sqlx::query("UPDATE accounts SET status = $1, updated_at = now() WHERE id = $2")
                .bind(status.as_str())
                .bind(id.as_str())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl AccountDirectory for PgAccountDirectory {
    fn find_account<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, Option<AccountSummary>> {
        Box::pin(self.find_account_inner(id))
    }

    fn find_admin<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, Option<AdminAccount>> {
        Box::pin(self.find_admin_inner(id))
    }

    fn ids_matching<'a>(
        &'a self,
        predicate: &'a LocationPredicate,
    ) -> StoreFuture<'a, Vec<AccountId>> {
        Box::pin(self.ids_matching_inner(predicate))
    }

    fn list<'a>(
        &'a self,
        only: Option<&'a [AccountId]>,
        page: PageRequest,
    ) -> StoreFuture<'a, Page<AccountSummary>> {
        Box::pin(self.list_inner(only, page))
    }

    fn set_role<'a>(
        &'a self,
        id: &'a AccountId,
        role: AccountRole,
        location: Option<&'a LocationScope>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(self.set_role_inner(id, role, location))
    }

    fn set_status<'a>(
        &'a self,
        id: &'a AccountId,
        status: AccountStatus,
    ) -> StoreFuture<'a, bool> {
        Box::pin(self.set_status_inner(id, status))
    }
}
