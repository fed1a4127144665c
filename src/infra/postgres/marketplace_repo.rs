use {
    crate::domain::{
        error::ActivityError,
        id::AccountId,
        marketplace::{AccountRow, ListingRow, OrderRow},
        store::{MarketplaceTables, StoreFuture},
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
};

#[derive(sqlx::FromRow)]
struct PgAccountRow {
    id: String,
    name: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct PgOrderRow {
    id: String,
    buyer_id: String,
    buyer_name: String,
    buyer_email: String,
    listing_id: Option<String>,
    listing_title: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct PgListingRow {
    id: String,
    seller_id: String,
    seller_name: String,
    seller_email: String,
    title: String,
    category: Option<String>,
    created_at: DateTime<Utc>,
}

pub struct PgMarketplaceTables {
    pool: PgPool,
}

impl PgMarketplaceTables {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn recent_accounts_inner(&self, limit: u32) -> Result<Vec<AccountRow>, ActivityError> {
        let rows = sqlx::query_as::<_, PgAccountRow>(
            "SELECT id, name, email, role, created_at FROM accounts ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| -> Result<AccountRow, ActivityError> {
                Ok(AccountRow {
                    id: AccountId::new(r.id)?,
                    name: r.name,
                    email: r.email,
                    role: r.role,
                    created_at: r.created_at,
                })
            })
            .collect()
    }

    async fn recent_orders_inner(&self, limit: u32) -> Result<Vec<OrderRow>, ActivityError> {
        let rows = sqlx::query_as::<_, PgOrderRow>(
            r#"
            SELECT o.id, o.buyer_id, a.name AS buyer_name, a.email AS buyer_email,
                   o.listing_id, l.title AS listing_title, o.status, o.created_at, o.updated_at
            FROM orders o
            JOIN accounts a ON a.id = o.buyer_id
            LEFT JOIN listings l ON l.id = o.listing_id
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| -> Result<OrderRow, ActivityError> {
                Ok(OrderRow {
                    id: r.id,
                    buyer_id: AccountId::new(r.buyer_id)?,
                    buyer_name: r.buyer_name,
                    buyer_email: r.buyer_email,
                    listing_id: r.listing_id,
                    listing_title: r.listing_title,
                    status: r.status,
                    created_at: r.created_at,
                    updated_at: r.updated_at,
                })
            })
            .collect()
    }

    async fn recent_listings_inner(&self, limit: u32) -> Result<Vec<ListingRow>, ActivityError> {
        let rows = sqlx::query_as::<_, PgListingRow>(
            r#"
            SELECT l.id, l.seller_id, a.name AS seller_name, a.email AS seller_email,
                   l.title, l.category, l.created_at
            FROM listings l
            JOIN accounts a ON a.id = l.seller_id
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| -> Result<ListingRow, ActivityError> {
                Ok(ListingRow {
                    id: r.id,
                    seller_id: AccountId::new(r.seller_id)?,
                    seller_name: r.seller_name,
                    seller_email: r.seller_email,
                    title: r.title,
                    category: r.category,
                    created_at: r.created_at,
                })
            })
            .collect()
    }
}

impl MarketplaceTables for PgMarketplaceTables {
    fn recent_accounts(&self, limit: u32) -> StoreFuture<'_, Vec<AccountRow>> {
        Box::pin(self.recent_accounts_inner(limit))
    }

    fn recent_orders(&self, limit: u32) -> StoreFuture<'_, Vec<OrderRow>> {
        Box::pin(self.recent_orders_inner(limit))
    }

    fn recent_listings(&self, limit: u32) -> StoreFuture<'_, Vec<ListingRow>> {
        Box::pin(self.recent_listings_inner(limit))
    }
}
