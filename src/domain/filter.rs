use {
    super::audit::{AuditAction, AuditRecord, ResourceType, Severity},
    super::error::ActivityError,
    super::id::AccountId,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

pub const MAX_PAGE_SIZE: u32 = 100;

/// Conjunctive audit query. Absent fields are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditLogFilter {
    pub actor_id: Option<AccountId>,
    pub action: Option<AuditAction>,
    pub resource_type: Option<ResourceType>,
    pub severity: Option<Severity>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub search_term: Option<String>,
}

impl AuditLogFilter {
    /// Trim the search term and reject inverted date ranges.
    pub fn validated(mut self) -> Result<Self, ActivityError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && start > end
        {
            return Err(ActivityError::Validation(format!(
                "start_date {start} is after end_date {end}"
            )));
        }
        self.search_term = self
            .search_term
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.actor_id.is_none()
            && self.action.is_none()
            && self.resource_type.is_none()
            && self.severity.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.search_term.is_none()
    }

    /// Reference predicate. Stores that evaluate filters elsewhere
    /// (SQL) must agree with this.
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(actor_id) = &self.actor_id
            && record.actor_id() != actor_id
        {
            return false;
        }
        if let Some(action) = self.action
            && record.action() != action
        {
            return false;
        }
        if let Some(resource_type) = self.resource_type
            && record.resource_type() != resource_type
        {
            return false;
        }
        if let Some(severity) = self.severity
            && record.severity() != severity
        {
            return false;
        }
        if let Some(start) = self.start_date
            && record.timestamp() < start
        {
            return false;
        }
        if let Some(end) = self.end_date
            && record.timestamp() > end
        {
            return false;
        }
        match &self.search_term {
            Some(term) => search_matches(term, record),
            None => true,
        }
    }
}

/// Case-insensitive substring across action, actor name and the details.
/// Details match per top-level entry: the key, or the text of a scalar
/// value. Nested objects and arrays are not searched.
fn search_matches(term: &str, record: &AuditRecord) -> bool {
    let needle = term.to_lowercase();
    let hit = |s: &str| s.to_lowercase().contains(&needle);
    hit(record.action().as_str())
        || hit(record.actor_name())
        || record
            .details()
            .iter()
            .any(|(key, value)| hit(key) || scalar_text(value).is_some_and(|v| hit(&v)))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Escape `%`, `_` and `\` so a user term is matched literally by (I)LIKE.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Result<Self, ActivityError> {
        if page == 0 {
            return Err(ActivityError::Validation("page starts at 1".into()));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ActivityError::Validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got: {page_size}"
            )));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Index of the first row on this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }

    /// Cut this page out of an already ordered, fully materialized sequence.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let from = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        items
            .iter()
            .skip(from)
            .take(self.page_size as usize)
            .cloned()
            .collect()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

/// A page of results plus the exact number of matches across all pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            total: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn page_bounds_are_validated() {
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, MAX_PAGE_SIZE + 1).is_err());
        let p = PageRequest::new(3, 10).unwrap();
        assert_eq!(p.offset(), 20);
    }

    #[test]
    fn slice_past_the_end_is_empty() {
        let items: Vec<u32> = (0..5).collect();
        assert_eq!(PageRequest::new(2, 3).unwrap().slice(&items), vec![3, 4]);
        assert!(PageRequest::new(3, 3).unwrap().slice(&items).is_empty());
    }

    #[test]
    fn search_matches_detail_entries_not_their_encoding() {
        let record = AuditRecord::new(
            &crate::domain::audit::Actor::new(AccountId::new("a1").unwrap(), "Ann", "ann@example.com"),
            &crate::domain::audit::RequestOrigin::default(),
            crate::domain::audit::AuditEvent::new(AuditAction::UserSuspended, ResourceType::User)
                .detail("reason", "Chargeback fraud")
                .detail("closed_suspensions", 2)
                .detail("nested", serde_json::json!({ "hidden": "needle" })),
            Utc::now(),
        );
        let search = |term: &str| {
            AuditLogFilter {
                search_term: Some(term.into()),
                ..Default::default()
            }
            .matches(&record)
        };

        assert!(search("FRAUD"));
        assert!(search("closed_susp"));
        assert!(search("2"));
        // Separators of the JSON encoding are never part of a match.
        assert!(!search("reason\":\"charge"));
        assert!(!search("needle"));
    }

    #[test]
    fn blank_search_term_is_dropped() {
        let filter = AuditLogFilter {
            search_term: Some("   ".into()),
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let now = Utc::now();
        let filter = AuditLogFilter {
            start_date: Some(now),
            end_date: Some(now - chrono::Duration::hours(1)),
            ..Default::default()
        };
        assert!(matches!(
            filter.validated(),
            Err(ActivityError::Validation(_))
        ));
    }
}
