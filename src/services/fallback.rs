use {
    crate::domain::{
        audit::{Actor, AuditAction, AuditEvent, AuditRecord, ResourceType},
        error::ActivityError,
        filter::{AuditLogFilter, Page, PageRequest},
        marketplace::{AccountRow, ListingRow, OrderRow},
        store::MarketplaceTables,
    },
    std::sync::Arc,
};

/// Rows read per source table.
pub const DEFAULT_WINDOW: u32 = 20;

/// Builds an audit-shaped feed straight from the primary tables for when
/// no audit trail exists yet.
pub struct FallbackReconstructor {
    tables: Arc<dyn MarketplaceTables>,
    window: u32,
}

impl FallbackReconstructor {
    pub fn new(tables: Arc<dyn MarketplaceTables>, window: u32) -> Self {
        Self {
            tables,
            window: window.max(1),
        }
    }

    /// Filter and paginate the reconstructed feed. `total` counts every
    /// reconstructed record that passes the filter.
    pub async fn reconstruct(
        &self,
        filter: &AuditLogFilter,
        page: PageRequest,
    ) -> Result<Page<AuditRecord>, ActivityError> {
        let matched: Vec<AuditRecord> = self
            .synthesize()
            .await?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        Ok(Page {
            records: page.slice(&matched),
            total: matched.len() as u64,
        })
    }

    /// All reconstructed records, newest first. Ties keep source order:
    /// accounts, then orders, then listings.
    pub async fn synthesize(&self) -> Result<Vec<AuditRecord>, ActivityError> {
        let (accounts, orders, listings) = tokio::try_join!(
            self.tables.recent_accounts(self.window),
            self.tables.recent_orders(self.window),
            self.tables.recent_listings(self.window),
        )?;

        let mut records = Vec::with_capacity(accounts.len() + orders.len() * 2 + listings.len());
        records.extend(accounts.iter().map(account_registered));
        for order in &orders {
            records.push(order_placed(order));
            if order.updated_at != order.created_at {
                records.push(order_status_changed(order));
            }
        }
        records.extend(listings.iter().map(product_created));

        // sort_by is stable, which preserves the per-source order on ties.
        records.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        tracing::debug!(count = records.len(), "reconstructed activity feed");
        Ok(records)
    }
}

fn account_registered(row: &AccountRow) -> AuditRecord {
    let actor = Actor::new(row.id.clone(), &row.name, &row.email);
    let event = AuditEvent::new(AuditAction::UserRegistered, ResourceType::User)
        .resource(row.id.as_str())
        .detail("email", row.email.as_str())
        .detail("role", row.role.as_str());
    AuditRecord::synthesized("user", row.id.as_str(), &actor, event, row.created_at)
}

fn buyer(row: &OrderRow) -> Actor {
    Actor::new(row.buyer_id.clone(), &row.buyer_name, &row.buyer_email)
}

fn order_placed(row: &OrderRow) -> AuditRecord {
    let event = AuditEvent::new(AuditAction::OrderPlaced, ResourceType::Order)
        .resource(row.id.as_str())
        .detail("listing_id", row.listing_id.clone())
        .detail("listing_title", row.listing_title.clone())
        .detail("status", row.status.as_str());
    AuditRecord::synthesized("order", &row.id, &buyer(row), event, row.created_at)
}

fn order_status_changed(row: &OrderRow) -> AuditRecord {
    let event = AuditEvent::new(AuditAction::OrderStatusChanged, ResourceType::Order)
        .resource(row.id.as_str())
        .detail("new_status", row.status.as_str())
        .detail("listing_title", row.listing_title.clone());
    AuditRecord::synthesized("order_status", &row.id, &buyer(row), event, row.updated_at)
}

fn product_created(row: &ListingRow) -> AuditRecord {
    let seller = Actor::new(row.seller_id.clone(), &row.seller_name, &row.seller_email);
    let event = AuditEvent::new(AuditAction::ProductCreated, ResourceType::Product)
        .resource(row.id.as_str())
        .detail("title", row.title.as_str())
        .detail("category", row.category.clone());
    AuditRecord::synthesized("product", &row.id, &seller, event, row.created_at)
}
