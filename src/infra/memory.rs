//! In-process implementations of the storage traits. They follow the same
//! contracts as the Postgres repositories and can simulate an absent audit
//! store, missing DDL privileges, or an unreachable backend.

use {
    super::postgres::audit_repo::AUDIT_LOG_DDL,
    crate::domain::{
        account::{AccountRole, AccountStatus, AccountSummary, AdminAccount},
        audit::AuditRecord,
        error::ActivityError,
        filter::{AuditLogFilter, Page, PageRequest},
        id::AccountId,
        location::{LocationPredicate, LocationScope},
        marketplace::{AccountRow, ListingRow, OrderRow},
        store::{
            AccountDirectory, AuditStore, MarketplaceTables, StoreFuture, StoreProbe,
            SuspensionStore,
        },
        suspension::SuspensionRecord,
    },
    std::{
        future::ready,
        sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    },
};

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, ActivityError> {
    lock.read()
        .map_err(|_| ActivityError::StoreUnavailable("memory store lock poisoned".into()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, ActivityError> {
    lock.write()
        .map_err(|_| ActivityError::StoreUnavailable("memory store lock poisoned".into()))
}

fn unavailable() -> ActivityError {
    ActivityError::StoreUnavailable("backend unreachable".into())
}

// ── Audit store ────────────────────────────────────────────────────────────

#[derive(Default)]
struct AuditState {
    present: bool,
    can_create: bool,
    unavailable: bool,
    records: Vec<AuditRecord>,
}

pub struct MemoryAuditStore {
    state: RwLock<AuditState>,
}

impl MemoryAuditStore {
    /// Store exists and is empty.
    pub fn new() -> Self {
        Self::with_state(true, true)
    }

    /// Store does not exist yet but can be created.
    pub fn absent() -> Self {
        Self::with_state(false, true)
    }

    /// Store does not exist and this process may not create it.
    pub fn absent_without_privilege() -> Self {
        Self::with_state(false, false)
    }

    fn with_state(present: bool, can_create: bool) -> Self {
        Self {
            state: RwLock::new(AuditState {
                present,
                can_create,
                ..Default::default()
            }),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.write() {
            state.unavailable = unavailable;
        }
    }

    /// Seed a record directly, bypassing emission.
    pub fn insert(&self, record: AuditRecord) {
        if let Ok(mut state) = self.state.write() {
            state.present = true;
            state.records.push(record);
        }
    }

    /// Snapshot in insertion order.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.state
            .read()
            .map(|s| s.records.clone())
            .unwrap_or_default()
    }

    fn ready_state(&self) -> Result<RwLockReadGuard<'_, AuditState>, ActivityError> {
        let state = read(&self.state)?;
        if state.unavailable {
            return Err(unavailable());
        }
        if !state.present {
            return Err(ActivityError::StoreUnavailable(
                "audit_logs does not exist".into(),
            ));
        }
        Ok(state)
    }

    fn sorted_matches(&self, filter: &AuditLogFilter) -> Result<Vec<AuditRecord>, ActivityError> {
        let state = self.ready_state()?;
        let mut matched: Vec<AuditRecord> = state
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            b.timestamp()
                .cmp(&a.timestamp())
                .then_with(|| b.id().as_str().cmp(a.id().as_str()))
        });
        Ok(matched)
    }

    fn probe_now(&self) -> Result<StoreProbe, ActivityError> {
        let state = read(&self.state)?;
        if state.unavailable {
            return Err(unavailable());
        }
        Ok(if state.present {
            StoreProbe::Ready
        } else {
            StoreProbe::Absent
        })
    }

    fn create_now(&self) -> Result<(), ActivityError> {
        let mut state = write(&self.state)?;
        if state.unavailable {
            return Err(unavailable());
        }
        if !state.present && !state.can_create {
            return Err(ActivityError::SetupRequired {
                reason: "permission denied to create audit_logs".into(),
                script: AUDIT_LOG_DDL.trim().to_string(),
            });
        }
        state.present = true;
        Ok(())
    }

    fn append_now(&self, record: &AuditRecord) -> Result<(), ActivityError> {
        drop(self.ready_state()?);
        let mut state = write(&self.state)?;
        if !state.records.iter().any(|r| r.id() == record.id()) {
            state.records.push(record.clone());
        }
        Ok(())
    }
}

impl Default for MemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditStore for MemoryAuditStore {
    fn probe(&self) -> StoreFuture<'_, StoreProbe> {
        Box::pin(ready(self.probe_now()))
    }

    fn create_schema(&self) -> StoreFuture<'_, ()> {
        Box::pin(ready(self.create_now()))
    }

    fn append<'a>(&'a self, record: &'a AuditRecord) -> StoreFuture<'a, ()> {
        Box::pin(ready(self.append_now(record)))
    }

    fn search<'a>(
        &'a self,
        filter: &'a AuditLogFilter,
        page: PageRequest,
    ) -> StoreFuture<'a, Page<AuditRecord>> {
        let result = self.sorted_matches(filter).map(|all| Page {
            records: page.slice(&all),
            total: all.len() as u64,
        });
        Box::pin(ready(result))
    }

    fn count<'a>(&'a self, filter: &'a AuditLogFilter) -> StoreFuture<'a, u64> {
        let result = self.sorted_matches(filter).map(|all| all.len() as u64);
        Box::pin(ready(result))
    }

    fn recent(&self, limit: u32) -> StoreFuture<'_, Vec<AuditRecord>> {
        let result = self
            .sorted_matches(&AuditLogFilter::default())
            .map(|mut all| {
                all.truncate(limit as usize);
                all
            });
        Box::pin(ready(result))
    }
}

// ── Marketplace tables ─────────────────────────────────────────────────────

#[derive(Default)]
struct MarketplaceState {
    unavailable: bool,
    accounts: Vec<AccountRow>,
    orders: Vec<OrderRow>,
    listings: Vec<ListingRow>,
}

#[derive(Default)]
pub struct MemoryMarketplace {
    state: RwLock<MarketplaceState>,
}

impl MemoryMarketplace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, row: AccountRow) {
        if let Ok(mut state) = self.state.write() {
            state.accounts.push(row);
        }
    }

    pub fn add_order(&self, row: OrderRow) {
        if let Ok(mut state) = self.state.write() {
            state.orders.push(row);
        }
    }

    pub fn add_listing(&self, row: ListingRow) {
        if let Ok(mut state) = self.state.write() {
            state.listings.push(row);
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.write() {
            state.unavailable = unavailable;
        }
    }

    /// Newest first, ties broken by descending id.
    fn newest<T: Clone>(
        &self,
        limit: u32,
        pick: impl Fn(&MarketplaceState) -> &Vec<T>,
        key: impl Fn(&T) -> (chrono::DateTime<chrono::Utc>, &str),
    ) -> Result<Vec<T>, ActivityError> {
        let state = read(&self.state)?;
        if state.unavailable {
            return Err(unavailable());
        }
        let mut rows = pick(&state).clone();
        rows.sort_by(|a, b| key(b).cmp(&key(a)));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

impl MarketplaceTables for MemoryMarketplace {
    fn recent_accounts(&self, limit: u32) -> StoreFuture<'_, Vec<AccountRow>> {
        Box::pin(ready(self.newest(limit, |s| &s.accounts, |r| (r.created_at, r.id.as_str()))))
    }

    fn recent_orders(&self, limit: u32) -> StoreFuture<'_, Vec<OrderRow>> {
        Box::pin(ready(self.newest(limit, |s| &s.orders, |r| (r.created_at, r.id.as_str()))))
    }

    fn recent_listings(&self, limit: u32) -> StoreFuture<'_, Vec<ListingRow>> {
        Box::pin(ready(self.newest(limit, |s| &s.listings, |r| (r.created_at, r.id.as_str()))))
    }
}

// ── Account directory ──────────────────────────────────────────────────────

#[derive(Clone)]
struct StoredAccount {
    summary: AccountSummary,
    assigned_location: Option<LocationScope>,
}

#[derive(Default)]
struct DirectoryState {
    unavailable: bool,
    accounts: Vec<StoredAccount>,
}

#[derive(Default)]
pub struct MemoryAccountDirectory {
    state: RwLock<DirectoryState>,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, summary: AccountSummary, assigned_location: Option<LocationScope>) {
        if let Ok(mut state) = self.state.write() {
            state.accounts.retain(|a| a.summary.id != summary.id);
            state.accounts.push(StoredAccount {
                summary,
                assigned_location,
            });
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.write() {
            state.unavailable = unavailable;
        }
    }

    fn live(&self) -> Result<RwLockReadGuard<'_, DirectoryState>, ActivityError> {
        let state = read(&self.state)?;
        if state.unavailable {
            return Err(unavailable());
        }
        Ok(state)
    }

    fn find(&self, id: &AccountId) -> Result<Option<StoredAccount>, ActivityError> {
        Ok(self
            .live()?
            .accounts
            .iter()
            .find(|a| &a.summary.id == id)
            .cloned())
    }

    fn find_admin_now(&self, id: &AccountId) -> Result<Option<AdminAccount>, ActivityError> {
        match self.find(id)? {
            Some(a) if a.summary.role.is_admin() => AdminAccount::new(
                a.summary.id,
                a.summary.name,
                a.summary.email,
                a.summary.role,
                a.assigned_location,
                a.summary.status,
            )
            .map(Some),
            _ => Ok(None),
        }
    }

    fn ids_matching_now(
        &self,
        predicate: &LocationPredicate,
    ) -> Result<Vec<AccountId>, ActivityError> {
        if predicate.is_unconstrained() {
            return Err(ActivityError::Validation(
                "location predicate has no enforceable clause".into(),
            ));
        }
        let mut ids: Vec<AccountId> = self
            .live()?
            .accounts
            .iter()
            .filter(|a| predicate.matches(&a.summary.location))
            .map(|a| a.summary.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn list_now(
        &self,
        only: Option<&[AccountId]>,
        page: PageRequest,
    ) -> Result<Page<AccountSummary>, ActivityError> {
        let mut matched: Vec<AccountSummary> = self
            .live()?
            .accounts
            .iter()
            .filter(|a| only.is_none_or(|ids| ids.contains(&a.summary.id)))
            .map(|a| a.summary.clone())
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(Page {
            records: page.slice(&matched),
            total: matched.len() as u64,
        })
    }

    fn set_role_now(
        &self,
        id: &AccountId,
        role: AccountRole,
        location: Option<&LocationScope>,
    ) -> Result<(), ActivityError> {
        let mut state = write(&self.state)?;
        if state.unavailable {
            return Err(unavailable());
        }
        let account = state
            .accounts
            .iter_mut()
            .find(|a| &a.summary.id == id)
            .ok_or_else(|| ActivityError::NotFound {
                entity: "account",
                id: id.to_string(),
            })?;
        account.summary.role = role;
        account.assigned_location = location.cloned();
        Ok(())
    }

    fn set_status_now(&self, id: &AccountId, status: AccountStatus) -> Result<bool, ActivityError> {
        let mut state = write(&self.state)?;
        if state.unavailable {
            return Err(unavailable());
        }
        Ok(match state.accounts.iter_mut().find(|a| &a.summary.id == id) {
            Some(account) => {
                account.summary.status = status;
                true
            }
            None => false,
        })
    }
}

impl AccountDirectory for MemoryAccountDirectory {
    fn find_account<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, Option<AccountSummary>> {
        Box::pin(ready(self.find(id).map(|a| a.map(|a| a.summary))))
    }

    fn find_admin<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, Option<AdminAccount>> {
        Box::pin(ready(self.find_admin_now(id)))
    }

    fn ids_matching<'a>(
        &'a self,
        predicate: &'a LocationPredicate,
    ) -> StoreFuture<'a, Vec<AccountId>> {
        Box::pin(ready(self.ids_matching_now(predicate)))
    }

    fn list<'a>(
        &'a self,
        only: Option<&'a [AccountId]>,
        page: PageRequest,
    ) -> StoreFuture<'a, Page<AccountSummary>> {
        Box::pin(ready(self.list_now(only, page)))
    }

    fn set_role<'a>(
        &'a self,
        id: &'a AccountId,
        role: AccountRole,
        location: Option<&'a LocationScope>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(ready(self.set_role_now(id, role, location)))
    }

    fn set_status<'a>(
        &'a self,
        id: &'a AccountId,
        status: AccountStatus,
    ) -> StoreFuture<'a, bool> {
        Box::pin(ready(self.set_status_now(id, status)))
    }
}

// ── Suspensions ────────────────────────────────────────────────────────────

#[derive(Default)]
struct SuspensionState {
    unavailable: bool,
    records: Vec<SuspensionRecord>,
}

#[derive(Default)]
pub struct MemorySuspensionStore {
    state: RwLock<SuspensionState>,
}

impl MemorySuspensionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.write() {
            state.unavailable = unavailable;
        }
    }

    /// Every record ever written for the user, oldest first.
    pub fn history(&self, user_id: &AccountId) -> Vec<SuspensionRecord> {
        self.state
            .read()
            .map(|s| {
                s.records
                    .iter()
                    .filter(|r| &r.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn latest_active_now(
        &self,
        user_id: &AccountId,
    ) -> Result<Option<SuspensionRecord>, ActivityError> {
        let state = read(&self.state)?;
        if state.unavailable {
            return Err(unavailable());
        }
        Ok(state
            .records
            .iter()
            .filter(|r| &r.user_id == user_id && r.is_active)
            .max_by_key(|r| r.suspended_at)
            .cloned())
    }

    fn insert_now(&self, record: &SuspensionRecord) -> Result<(), ActivityError> {
        let mut state = write(&self.state)?;
        if state.unavailable {
            return Err(unavailable());
        }
        state.records.push(record.clone());
        Ok(())
    }

    fn close_active_now(&self, user_id: &AccountId) -> Result<u64, ActivityError> {
        let mut state = write(&self.state)?;
        if state.unavailable {
            return Err(unavailable());
        }
        let mut closed = 0;
        for record in state
            .records
            .iter_mut()
            .filter(|r| &r.user_id == user_id && r.is_active)
        {
            record.is_active = false;
            closed += 1;
        }
        Ok(closed)
    }
}

impl SuspensionStore for MemorySuspensionStore {
    fn latest_active<'a>(
        &'a self,
        user_id: &'a AccountId,
    ) -> StoreFuture<'a, Option<SuspensionRecord>> {
        Box::pin(ready(self.latest_active_now(user_id)))
    }

    fn insert<'a>(&'a self, record: &'a SuspensionRecord) -> StoreFuture<'a, ()> {
        Box::pin(ready(self.insert_now(record)))
    }

    fn close_active<'a>(&'a self, user_id: &'a AccountId) -> StoreFuture<'a, u64> {
        Box::pin(ready(self.close_active_now(user_id)))
    }
}
