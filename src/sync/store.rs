use crate::model::{ExpenseRecord, PageResult, RecordId};
use crate::sync::ScopeKey;

/// The records accumulated for one scope across paginated fetches.
///
/// Pages are kept exactly as the service sent them: in server order, never re-sorted and never
/// deduplicated. If the service returns overlapping pages, the overlap shows up twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordStore {
    items: Vec<ExpenseRecord>,
    scope: Option<ScopeKey>,
    page: u32,
    has_next: bool,
    total: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the accumulated records and the pagination cursor.
    pub fn reset(&mut self) {
        self.items.clear();
        self.scope = None;
        self.page = 0;
        self.has_next = false;
        self.total = 0;
    }

    /// Concatenates a page onto the end of the accumulated records and moves the cursor to it.
    pub fn append(&mut self, page: PageResult) {
        self.items.extend(page.items);
        self.page = page.page;
        self.has_next = page.has_next;
        self.total = page.total;
    }

    /// Resets the store and starts it over with the first page of `scope`.
    pub fn replace(&mut self, scope: ScopeKey, page: PageResult) {
        self.reset();
        self.scope = Some(scope);
        self.append(page);
    }

    pub fn find(&self, id: &RecordId) -> Option<&ExpenseRecord> {
        self.items.iter().find(|record| record.id() == id)
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ExpenseRecord] {
        &self.items
    }

    /// The scope the accumulated records belong to. `None` until the first page arrives.
    pub fn scope(&self) -> Option<&ScopeKey> {
        self.scope.as_ref()
    }

    /// The page to request next, if the service said there is one.
    pub fn next_page(&self) -> Option<u32> {
        self.has_next.then_some(self.page + 1)
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    /// The size of the whole scope as last reported by the service.
    pub fn total(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u32) -> ExpenseRecord {
        let json = format!(r#"{{"id": {id}, "item": "item {id}", "amount": {id}, "month": "Dec 2025"}}"#);
        serde_json::from_str(&json).unwrap()
    }

    fn page(number: u32, ids: &[u32], has_next: bool) -> PageResult {
        PageResult {
            items: ids.iter().copied().map(record).collect(),
            page: number,
            has_next,
            total: 5,
        }
    }

    #[test]
    fn appends_in_fetch_order() {
        let mut store = RecordStore::new();
        store.replace(ScopeKey::default(), page(1, &[5, 4], true));
        store.append(page(2, &[3, 2], true));
        store.append(page(3, &[1], false));

        let ids: Vec<&str> = store.items().iter().map(|r| r.id().as_str()).collect();
        assert_eq!(ids, vec!["5", "4", "3", "2", "1"]);
        assert_eq!(store.size(), 5);
        assert_eq!(store.next_page(), None);
        assert_eq!(store.total(), 5);
    }

    #[test]
    fn overlapping_pages_are_kept() {
        let mut store = RecordStore::new();
        store.replace(ScopeKey::default(), page(1, &[3, 2], true));
        store.append(page(2, &[2, 1], false));
        assert_eq!(store.size(), 4);
    }

    #[test]
    fn replace_starts_over() {
        let mut store = RecordStore::new();
        store.replace(ScopeKey::default(), page(1, &[3, 2], true));
        assert_eq!(store.next_page(), Some(2));

        let scope = ScopeKey {
            month: None,
            search: Some("tea".into()),
        };
        store.replace(scope.clone(), page(1, &[9], false));
        assert_eq!(store.size(), 1);
        assert_eq!(store.scope(), Some(&scope));
        assert!(store.find(&RecordId::new("9")).is_some());
        assert!(store.find(&RecordId::new("3")).is_none());
    }

    #[test]
    fn reset_clears_everything() {
        let mut store = RecordStore::new();
        store.replace(ScopeKey::default(), page(1, &[1], true));
        store.reset();
        assert!(store.is_empty());
        assert_eq!(store.scope(), None);
        assert!(!store.has_next());
    }
}
