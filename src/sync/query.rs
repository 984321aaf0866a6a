use crate::api::ExpenseQuery;
use crate::model::MonthSelector;
use serde::{Deserialize, Serialize};

/// Identifies the records a listing belongs to. Two listings with equal keys can be concatenated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ScopeKey {
    pub month: Option<MonthSelector>,
    pub search: Option<String>,
}

impl ScopeKey {
    /// The listing request for `page` of this scope.
    pub fn query(&self, page: u32, limit: u32) -> ExpenseQuery {
        ExpenseQuery {
            page,
            limit,
            month: self.month.clone(),
            search: self.search.clone(),
        }
    }
}

/// Where the session is in its fetch cycle. There is no automatic retry: `Error` stays until the
/// user triggers another fetch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchState {
    #[default]
    Idle,
    Fetching,
    Error,
}

serde_plain::derive_display_from_serialize!(FetchState);

/// The active scope (month, search and page) and the fetch state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    month: Option<MonthSelector>,
    search: Option<String>,
    page: u32,
    dirty: bool,
    fetch: FetchState,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            month: None,
            search: None,
            page: 1,
            dirty: false,
            fetch: FetchState::Idle,
        }
    }
}

impl QueryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn month(&self) -> Option<&MonthSelector> {
        self.month.as_ref()
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// True from a month or search change until the first page fetched for it settles.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn fetch_state(&self) -> FetchState {
        self.fetch
    }

    pub fn set_month(&mut self, month: Option<MonthSelector>) {
        self.month = month;
        self.page = 1;
        self.dirty = true;
    }

    /// Blank text clears the search.
    pub fn set_search(&mut self, text: &str) {
        let text = text.trim();
        self.search = (!text.is_empty()).then(|| text.to_string());
        self.page = 1;
        self.dirty = true;
    }

    /// Moves the cursor for load-more. Never resets anything.
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Takes the month the service resolved for an absent selector. Unlike `set_month`, this is
    /// not a user change, so the scope is not marked dirty.
    pub fn adopt_month(&mut self, month: MonthSelector) {
        self.month = Some(month);
    }

    pub fn scope_key(&self) -> ScopeKey {
        ScopeKey {
            month: self.month.clone(),
            search: self.search.clone(),
        }
    }

    /// Idle or Error to Fetching. Also rewinds to the first page, which every scoped fetch starts
    /// from.
    pub(crate) fn begin_first_page(&mut self) {
        self.page = 1;
        self.fetch = FetchState::Fetching;
    }

    /// The latest first-page fetch came back, with records or an error.
    pub(crate) fn first_page_settled(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn begin(&mut self) {
        self.fetch = FetchState::Fetching;
    }

    pub(crate) fn settle(&mut self, ok: bool) {
        self.fetch = if ok {
            FetchState::Idle
        } else {
            FetchState::Error
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_changes_reset_page_and_mark_dirty() {
        let mut query = QueryState::new();
        query.set_page(4);
        query.set_search("coffee");
        assert_eq!(query.page(), 1);
        assert!(query.is_dirty());

        query.begin_first_page();
        query.set_page(3);
        query.set_month(MonthSelector::new("Nov 2025"));
        assert_eq!(query.page(), 1);
        assert!(query.is_dirty());
    }

    #[test]
    fn dirty_until_the_first_page_settles() {
        let mut query = QueryState::new();
        query.set_month(MonthSelector::new("Nov 2025"));
        query.begin_first_page();
        assert!(query.is_dirty());
        query.first_page_settled();
        assert!(!query.is_dirty());
        assert_eq!(query.month().map(|m| m.as_str()), Some("Nov 2025"));
    }

    #[test]
    fn blank_search_is_absent() {
        let mut query = QueryState::new();
        query.set_search("   ");
        assert_eq!(query.search(), None);
        assert_eq!(query.scope_key(), ScopeKey::default());
    }

    #[test]
    fn adopting_a_month_changes_the_key_without_dirtying() {
        let mut query = QueryState::new();
        let before = query.scope_key();
        query.adopt_month(MonthSelector::new("Dec 2025").unwrap());
        assert!(!query.is_dirty());
        assert_ne!(query.scope_key(), before);
    }

    #[test]
    fn fetch_state_machine() {
        let mut query = QueryState::new();
        assert_eq!(query.fetch_state(), FetchState::Idle);
        query.begin();
        assert_eq!(query.fetch_state(), FetchState::Fetching);
        query.settle(false);
        assert_eq!(query.fetch_state(), FetchState::Error);
        query.begin_first_page();
        assert_eq!(query.fetch_state(), FetchState::Fetching);
        query.settle(true);
        assert_eq!(query.fetch_state().to_string(), "idle");
    }

    #[test]
    fn scope_key_builds_query() {
        let key = ScopeKey {
            month: MonthSelector::new("Dec 2025"),
            search: Some("rent".into()),
        };
        let query = key.query(2, 50);
        assert_eq!(query.page, 2);
        assert_eq!(query.limit, 50);
        assert_eq!(query.search.as_deref(), Some("rent"));
    }
}
