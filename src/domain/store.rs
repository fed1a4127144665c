use {
    super::account::{AccountRole, AccountStatus, AccountSummary, AdminAccount},
    super::audit::AuditRecord,
    super::error::ActivityError,
    super::filter::{AuditLogFilter, Page, PageRequest},
    super::id::AccountId,
    super::location::{LocationPredicate, LocationScope},
    super::marketplace::{AccountRow, ListingRow, OrderRow},
    super::suspension::SuspensionRecord,
    std::{future::Future, pin::Pin},
};

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ActivityError>> + Send + 'a>>;

/// Result of the audit store existence probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreProbe {
    Ready,
    Absent,
}

/// Persistent audit trail.
pub trait AuditStore: Send + Sync {
    /// Side-effect-free existence check.
    fn probe(&self) -> StoreFuture<'_, StoreProbe>;

    /// Create the backing relation if missing. Must succeed when it already
    /// exists; returns `SetupRequired` when it cannot be created from here.
    fn create_schema(&self) -> StoreFuture<'_, ()>;

    fn append<'a>(&'a self, record: &'a AuditRecord) -> StoreFuture<'a, ()>;

    /// Newest first, with the exact count of all matches.
    fn search<'a>(
        &'a self,
        filter: &'a AuditLogFilter,
        page: PageRequest,
    ) -> StoreFuture<'a, Page<AuditRecord>>;

    fn count<'a>(&'a self, filter: &'a AuditLogFilter) -> StoreFuture<'a, u64>;

    /// The `limit` most recent records, newest first.
    fn recent(&self, limit: u32) -> StoreFuture<'_, Vec<AuditRecord>>;
}

/// Read-only view of the marketplace's primary tables, newest rows first.
pub trait MarketplaceTables: Send + Sync {
    fn recent_accounts(&self, limit: u32) -> StoreFuture<'_, Vec<AccountRow>>;
    fn recent_orders(&self, limit: u32) -> StoreFuture<'_, Vec<OrderRow>>;
    fn recent_listings(&self, limit: u32) -> StoreFuture<'_, Vec<ListingRow>>;
}

pub trait AccountDirectory: Send + Sync {
    fn find_account<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, Option<AccountSummary>>;

    /// `None` when the account is missing or holds no admin role.
    fn find_admin<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, Option<AdminAccount>>;

    /// Ids of accounts whose location satisfies every clause. Callers never
    /// pass an unconstrained predicate.
    fn ids_matching<'a>(
        &'a self,
        predicate: &'a LocationPredicate,
    ) -> StoreFuture<'a, Vec<AccountId>>;

    /// List accounts, optionally restricted to an id set.
    fn list<'a>(
        &'a self,
        only: Option<&'a [AccountId]>,
        page: PageRequest,
    ) -> StoreFuture<'a, Page<AccountSummary>>;

    fn set_role<'a>(
        &'a self,
        id: &'a AccountId,
        role: AccountRole,
        location: Option<&'a LocationScope>,
    ) -> StoreFuture<'a, ()>;

    /// Returns whether an account row was updated.
    fn set_status<'a>(
        &'a self,
        id: &'a AccountId,
        status: AccountStatus,
    ) -> StoreFuture<'a, bool>;
}

pub trait SuspensionStore: Send + Sync {
    /// Most recent record with `is_active = true`.
    fn latest_active<'a>(
        &'a self,
        user_id: &'a AccountId,
    ) -> StoreFuture<'a, Option<SuspensionRecord>>;

    fn insert<'a>(&'a self, record: &'a SuspensionRecord) -> StoreFuture<'a, ()>;

    /// Flip every active record for the user to inactive. Returns how many closed.
    fn close_active<'a>(&'a self, user_id: &'a AccountId) -> StoreFuture<'a, u64>;
}
