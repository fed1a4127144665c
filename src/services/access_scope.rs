use {
    crate::domain::{
        account::{AccessScope, AccountSummary, Visibility},
        error::ActivityError,
        filter::{Page, PageRequest},
        id::AccountId,
        location::LocationScope,
        store::AccountDirectory,
    },
    std::sync::Arc,
};

/// Turns an administrator's assigned location into the set of accounts
/// they may see.
pub struct AccessScopeResolver {
    directory: Arc<dyn AccountDirectory>,
}

impl AccessScopeResolver {
    pub fn new(directory: Arc<dyn AccountDirectory>) -> Self {
        Self { directory }
    }

    pub async fn resolve_scope(&self, admin_id: &AccountId) -> Result<AccessScope, ActivityError> {
        let admin = self
            .directory
            .find_admin(admin_id)
            .await?
            .ok_or_else(|| ActivityError::NotFound {
                entity: "admin",
                id: admin_id.to_string(),
            })?;
        Ok(admin.scope())
    }

    /// `All` for globally scoped admins; otherwise exactly the matching ids,
    /// which may be empty.
    pub async fn resolve_visible_account_ids(
        &self,
        admin_id: &AccountId,
    ) -> Result<Visibility, ActivityError> {
        match self.resolve_scope(admin_id).await? {
            AccessScope::Global => Ok(Visibility::All),
            AccessScope::Restricted(location) => {
                let ids = self.visible_under(&location).await?;
                tracing::debug!(
                    admin_id = %admin_id,
                    location = %location.compact_display(),
                    visible = ids.len(),
                    "resolved admin visibility"
                );
                Ok(Visibility::Only(ids))
            }
        }
    }

    /// Accounts inside a restricted location. A scope that only names
    /// streets has nothing to match on and yields no accounts.
    pub async fn visible_under(
        &self,
        location: &LocationScope,
    ) -> Result<Vec<AccountId>, ActivityError> {
        let predicate = location.predicate();
        if !predicate.unenforced_streets.is_empty() {
            tracing::warn!(
                streets = ?predicate.unenforced_streets,
                "street-level location constraint is not enforced"
            );
        }
        if predicate.is_unconstrained() {
            return Ok(Vec::new());
        }
        self.directory.ids_matching(&predicate).await
    }

    pub async fn list_visible_accounts(
        &self,
        admin_id: &AccountId,
        page: PageRequest,
    ) -> Result<Page<AccountSummary>, ActivityError> {
        match self.resolve_visible_account_ids(admin_id).await? {
            Visibility::All => self.directory.list(None, page).await,
            Visibility::Only(ids) if ids.is_empty() => Ok(Page::empty()),
            Visibility::Only(ids) => self.directory.list(Some(&ids), page).await,
        }
    }
}
