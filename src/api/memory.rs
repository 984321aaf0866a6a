//! Implements `ExpenseService` entirely in memory.
//!
//! Note: this is compiled even in the "production" version of this app so that the whole program
//! can run, top-to-bottom, without a running expense service. It follows the service's semantics:
//! ordering, month labels, carry-forward balances and error messages. It also records every
//! request it receives and can be told to fail or to answer slowly, which the tests rely on.

use crate::api::{month_param, Endpoint, ExpenseQuery, ExpenseService};
use crate::model::{
    Amount, BalanceSnapshot, Category, CategoryTotals, DashboardStats, Download, ExpenseDraft,
    ExpenseRecord, ImportFile, MonthSelector, PageResult, RecordId, SalaryEntry, DEFAULT_CATEGORY,
};
use crate::{SyncError, SyncResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// The categories a fresh service starts with.
const DEFAULT_CATEGORIES: &[&str] = &[
    "General",
    "Food & Dining",
    "Groceries",
    "Transportation",
    "Utilities",
    "Entertainment",
    "Health",
    "Shopping",
    "Other",
];

/// A request as the in-memory service received it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Request {
    pub endpoint: Endpoint,
    pub id: Option<RecordId>,
    pub params: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
}

impl Request {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// An injected failure for one endpoint. `remaining` of `None` fails every call.
#[derive(Debug, Clone)]
struct Failure {
    error: SyncError,
    remaining: Option<usize>,
}

#[derive(Debug, Clone)]
struct StoredExpense {
    id: u64,
    item: String,
    amount: Amount,
    category: String,
    date: Option<NaiveDate>,
    month: MonthSelector,
}

impl StoredExpense {
    fn record(&self) -> ExpenseRecord {
        ExpenseRecord::new(
            RecordId::new(self.id.to_string()),
            self.item.clone(),
            self.amount,
            self.category.clone(),
            self.date,
            self.month.clone(),
        )
    }
}

#[derive(Debug)]
struct MemoryState {
    today: NaiveDate,
    next_id: u64,
    expenses: Vec<StoredExpense>,
    categories: Vec<Category>,
    salaries: BTreeMap<MonthSelector, Amount>,
    requests: Vec<Request>,
    failures: BTreeMap<Endpoint, Failure>,
    list_latency: BTreeMap<Option<String>, Duration>,
}

impl MemoryState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn month_of(&self, date: Option<NaiveDate>) -> MonthSelector {
        MonthSelector::from_date(date.unwrap_or(self.today))
    }

    fn insert(&mut self, item: String, amount: Amount, category: String, date: Option<NaiveDate>) {
        let id = self.next_id();
        let month = self.month_of(date);
        self.expenses.push(StoredExpense {
            id,
            item,
            amount,
            category: if category.trim().is_empty() {
                DEFAULT_CATEGORY.to_string()
            } else {
                category
            },
            date,
            month,
        });
    }

    fn expenses_in(&self, month: &MonthSelector) -> impl Iterator<Item = &StoredExpense> + '_ {
        let month = month.clone();
        self.expenses.iter().filter(move |e| e.month == month)
    }

    fn position(&self, id: &RecordId) -> SyncResult<usize> {
        self.expenses
            .iter()
            .position(|e| e.id.to_string() == id.as_str())
            .ok_or_else(|| SyncError::service(404, "Not Found"))
    }
}

/// An in-memory expense service.
#[derive(Debug)]
pub struct MemoryService {
    state: Mutex<MemoryState>,
}

impl Default for MemoryService {
    /// Today's date, the default categories and some seed expenses.
    fn default() -> Self {
        let service = Self::new(chrono::Local::now().date_naive());
        {
            let mut state = service.state();
            // The seed data is a constant; a row that fails to parse is simply left out.
            for row in parse_rows(SEED_EXPENSES.as_bytes()).unwrap_or_default() {
                if let Some((item, amount, category, date)) = row.into_parts() {
                    state.insert(item, amount, category, date);
                }
            }
            for (month, amount) in SEED_SALARIES {
                if let Some(month) = MonthSelector::new(*month) {
                    state.salaries.insert(month, Amount::from(*amount));
                }
            }
        }
        service
    }
}

impl MemoryService {
    /// A service with the default categories and no expenses. `today` is used wherever the real
    /// service would look at the clock.
    pub fn new(today: NaiveDate) -> Self {
        let categories = DEFAULT_CATEGORIES
            .iter()
            .enumerate()
            .map(|(ix, name)| Category {
                id: RecordId::new((ix + 1).to_string()),
                name: name.to_string(),
            })
            .collect::<Vec<_>>();
        Self {
            state: Mutex::new(MemoryState {
                today,
                next_id: 1000,
                expenses: Vec::new(),
                categories,
                salaries: BTreeMap::new(),
                requests: Vec::new(),
                failures: BTreeMap::new(),
                list_latency: BTreeMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an expense directly, without recording a request.
    pub fn seed_expense(&self, item: &str, amount: impl Into<Amount>, category: &str, date: NaiveDate) {
        self.state()
            .insert(item.to_string(), amount.into(), category.to_string(), Some(date));
    }

    /// Sets a month's salary directly, without recording a request.
    pub fn seed_salary(&self, month: &str, amount: impl Into<Amount>) {
        if let Some(month) = MonthSelector::new(month) {
            self.state().salaries.insert(month, amount.into());
        }
    }

    /// The next call to `endpoint` fails with `error`.
    pub fn fail_next(&self, endpoint: Endpoint, error: SyncError) {
        self.state().failures.insert(
            endpoint,
            Failure {
                error,
                remaining: Some(1),
            },
        );
    }

    /// Every call to `endpoint` fails with `error` until `recover` is called.
    pub fn fail_always(&self, endpoint: Endpoint, error: SyncError) {
        self.state().failures.insert(
            endpoint,
            Failure {
                error,
                remaining: None,
            },
        );
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.state().failures.remove(&endpoint);
    }

    /// Delays listing responses for `search` (or for unsearched listings when `None`).
    pub fn set_list_latency(&self, search: Option<&str>, latency: Duration) {
        self.state()
            .list_latency
            .insert(search.map(str::to_string), latency);
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<Request> {
        self.state().requests.clone()
    }

    /// The requests received so far for `endpoint`.
    pub fn requests_to(&self, endpoint: Endpoint) -> Vec<Request> {
        self.state()
            .requests
            .iter()
            .filter(|r| r.endpoint == endpoint)
            .cloned()
            .collect()
    }

    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.requests_to(endpoint).len()
    }

    /// The number of stored expenses.
    pub fn expense_count(&self) -> usize {
        self.state().expenses.len()
    }

    /// Records the request and returns any injected failure for its endpoint.
    fn receive<B>(
        &self,
        endpoint: Endpoint,
        id: Option<&RecordId>,
        params: Vec<(&'static str, String)>,
        body: Option<&B>,
    ) -> SyncResult<()>
    where
        B: Serialize,
    {
        let mut state = self.state();
        state.requests.push(Request {
            endpoint,
            id: id.cloned(),
            params: params
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            body: body.and_then(|b| serde_json::to_value(b).ok()),
        });
        let (error, exhausted) = match state.failures.get_mut(&endpoint) {
            None => return Ok(()),
            Some(failure) => {
                if let Some(remaining) = failure.remaining.as_mut() {
                    *remaining = remaining.saturating_sub(1);
                }
                (failure.error.clone(), failure.remaining == Some(0))
            }
        };
        if exhausted {
            state.failures.remove(&endpoint);
        }
        Err(error)
    }

    fn receive_empty(&self, endpoint: Endpoint, id: Option<&RecordId>) -> SyncResult<()> {
        self.receive::<()>(endpoint, id, Vec::new(), None)
    }
}

#[async_trait::async_trait]
impl ExpenseService for MemoryService {
    async fn list_categories(&self) -> SyncResult<Vec<Category>> {
        self.receive_empty(Endpoint::ListCategories, None)?;
        let mut categories = self.state().categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn create_category(&self, name: &str) -> SyncResult<Category> {
        let body = serde_json::json!({ "name": name });
        self.receive(Endpoint::CreateCategory, None, Vec::new(), Some(&body))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SyncError::service(400, "Missing name"));
        }
        let mut state = self.state();
        if state.categories.iter().any(|c| c.name == name) {
            return Err(SyncError::service(400, "Exists"));
        }
        let category = Category {
            id: RecordId::new(state.next_id().to_string()),
            name: name.to_string(),
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn delete_category(&self, id: &RecordId) -> SyncResult<()> {
        self.receive_empty(Endpoint::DeleteCategory, Some(id))?;
        let mut state = self.state();
        let before = state.categories.len();
        state.categories.retain(|c| &c.id != id);
        if state.categories.len() == before {
            return Err(SyncError::service(404, "Not Found"));
        }
        Ok(())
    }

    async fn dashboard_stats(&self, month: Option<&MonthSelector>) -> SyncResult<DashboardStats> {
        self.receive::<()>(Endpoint::DashboardStats, None, month_param(month), None)?;
        let state = self.state();
        let target = month
            .cloned()
            .unwrap_or_else(|| MonthSelector::from_date(state.today));
        let salary = state.salaries.get(&target).copied().unwrap_or_default();
        let current_expenses: Amount = state.expenses_in(&target).map(|e| e.amount).sum();

        let mut months: BTreeSet<MonthSelector> = state.salaries.keys().cloned().collect();
        months.extend(state.expenses.iter().map(|e| e.month.clone()));

        // Carry forward every month strictly before the target month.
        let cutoff = target.first_day().unwrap_or(state.today);
        let previous_balance: Amount = months
            .iter()
            .filter(|m| m.first_day().is_some_and(|d| d < cutoff))
            .map(|m| {
                let income = state.salaries.get(m).copied().unwrap_or_default();
                let spent: Amount = state.expenses_in(m).map(|e| e.amount).sum();
                income - spent
            })
            .sum();

        let mut available_months: Vec<MonthSelector> = months.into_iter().collect();
        available_months.sort_by(|a, b| b.chronological(a));

        Ok(DashboardStats {
            balance: BalanceSnapshot {
                previous_balance,
                salary,
                current_expenses,
                remaining_balance: previous_balance + salary - current_expenses,
            },
            available_months,
            current_filter: Some(target),
        })
    }

    async fn list_expenses(&self, query: &ExpenseQuery) -> SyncResult<PageResult> {
        self.receive::<()>(Endpoint::ListExpenses, None, query.params(), None)?;
        let latency = self
            .state()
            .list_latency
            .get(&query.search)
            .copied()
            .unwrap_or_default();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let state = self.state();
        let needle = query.search.as_ref().map(|s| s.to_lowercase());
        let mut matching: Vec<&StoredExpense> = state
            .expenses
            .iter()
            .filter(|e| query.month.as_ref().map_or(true, |m| &e.month == m))
            .filter(|e| {
                needle
                    .as_ref()
                    .map_or(true, |n| e.item.to_lowercase().contains(n))
            })
            .collect();
        // Newest date first with undated records last, then newest id first.
        matching.sort_by_key(|e| (Reverse(e.date), Reverse(e.id)));

        let page = query.page.max(1);
        let limit = query.limit.max(1) as usize;
        let total = matching.len();
        let start = (page as usize - 1).saturating_mul(limit);
        let items = matching
            .iter()
            .skip(start)
            .take(limit)
            .map(|e| e.record())
            .collect();
        Ok(PageResult {
            items,
            page,
            has_next: start.saturating_add(limit) < total,
            total: total as u64,
        })
    }

    async fn create_expense(&self, draft: &ExpenseDraft) -> SyncResult<()> {
        self.receive(Endpoint::CreateExpense, None, Vec::new(), Some(draft))?;
        if draft.item.trim().is_empty() {
            return Err(SyncError::service(400, "Invalid data"));
        }
        self.state().insert(
            draft.item.clone(),
            draft.amount,
            draft.category.clone(),
            Some(draft.date),
        );
        Ok(())
    }

    async fn update_expense(&self, id: &RecordId, draft: &ExpenseDraft) -> SyncResult<()> {
        self.receive(Endpoint::UpdateExpense, Some(id), Vec::new(), Some(draft))?;
        let mut state = self.state();
        let ix = state.position(id)?;
        let month = MonthSelector::from_date(draft.date);
        let expense = &mut state.expenses[ix];
        expense.item = draft.item.clone();
        expense.amount = draft.amount;
        expense.category = draft.category.clone();
        expense.date = Some(draft.date);
        expense.month = month;
        Ok(())
    }

    async fn delete_expense(&self, id: &RecordId) -> SyncResult<()> {
        self.receive_empty(Endpoint::DeleteExpense, Some(id))?;
        let mut state = self.state();
        let ix = state.position(id)?;
        state.expenses.remove(ix);
        Ok(())
    }

    async fn clear_expenses(&self) -> SyncResult<()> {
        self.receive_empty(Endpoint::ClearExpenses, None)?;
        let mut state = self.state();
        state.expenses.clear();
        state.salaries.clear();
        Ok(())
    }

    async fn save_salary(&self, salary: &SalaryEntry) -> SyncResult<()> {
        self.receive(Endpoint::SaveSalary, None, Vec::new(), Some(salary))?;
        self.state()
            .salaries
            .insert(salary.month.clone(), salary.amount);
        Ok(())
    }

    async fn category_totals(&self, month: Option<&MonthSelector>) -> SyncResult<CategoryTotals> {
        self.receive::<()>(Endpoint::CategoryTotals, None, month_param(month), None)?;
        let state = self.state();
        let target = month
            .cloned()
            .unwrap_or_else(|| MonthSelector::from_date(state.today));
        let mut totals = BTreeMap::new();
        for expense in state.expenses_in(&target) {
            let total = totals
                .entry(expense.category.clone())
                .or_insert(Amount::ZERO);
            *total = *total + expense.amount;
        }
        Ok(CategoryTotals::new(totals))
    }

    async fn import(&self, file: &ImportFile) -> SyncResult<String> {
        let body = serde_json::json!({ "file_name": file.file_name, "size": file.bytes.len() });
        self.receive(Endpoint::Import, None, Vec::new(), Some(&body))?;
        if file.bytes.is_empty() {
            return Err(SyncError::service(400, "No file"));
        }
        let rows = parse_rows(&file.bytes)
            .map_err(|e| SyncError::service(400, format!("Invalid file: {e}")))?;
        let mut parsed = Vec::with_capacity(rows.len());
        for (ix, row) in rows.into_iter().enumerate() {
            let parts = row
                .into_parts()
                .ok_or_else(|| SyncError::service(400, format!("Invalid row {}", ix + 2)))?;
            parsed.push(parts);
        }
        let count = parsed.len();
        let mut state = self.state();
        for (item, amount, category, date) in parsed {
            state.insert(item, amount, category, date);
        }
        Ok(format!("Imported {count} expenses"))
    }

    async fn export(&self, month: Option<&MonthSelector>) -> SyncResult<Download> {
        self.receive::<()>(Endpoint::Export, None, month_param(month), None)?;
        let state = self.state();
        let mut rows: Vec<&StoredExpense> = state
            .expenses
            .iter()
            .filter(|e| month.map_or(true, |m| &e.month == m))
            .collect();
        rows.sort_by_key(|e| Reverse(e.date));

        let mut writer = csv::Writer::from_writer(Vec::new());
        let write = |writer: &mut csv::Writer<Vec<u8>>| -> csv::Result<()> {
            writer.write_record(["ID", "Date", "Item", "Category", "Amount", "Month"])?;
            for e in &rows {
                writer.write_record([
                    e.id.to_string(),
                    e.date.map(|d| d.to_string()).unwrap_or_default(),
                    e.item.clone(),
                    e.category.clone(),
                    e.amount.to_string(),
                    e.month.to_string(),
                ])?;
            }
            writer.flush()?;
            Ok(())
        };
        write(&mut writer).map_err(|e| SyncError::service(500, e.to_string()))?;
        let bytes = writer
            .into_inner()
            .map_err(|e| SyncError::service(500, e.to_string()))?;
        let file_name = match month {
            Some(month) => format!("Expenses_{month}.csv"),
            None => "All_Expenses.csv".to_string(),
        };
        Ok(Download { file_name, bytes })
    }

    async fn heartbeat(&self) -> SyncResult<()> {
        self.receive_empty(Endpoint::Heartbeat, None)
    }
}

/// One row of an import or seed CSV. The `ID` and `Month` columns of an export are ignored, so an
/// export can be imported again.
#[derive(Debug, Default, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date", default)]
    date: String,
    #[serde(rename = "Item", default)]
    item: String,
    #[serde(rename = "Category", default)]
    category: String,
    #[serde(rename = "Amount", default)]
    amount: String,
}

impl CsvRow {
    fn into_parts(self) -> Option<(String, Amount, String, Option<NaiveDate>)> {
        let item = self.item.trim().to_string();
        if item.is_empty() {
            return None;
        }
        let amount = Amount::from_str(&self.amount).ok()?;
        let date = match self.date.trim() {
            "" => None,
            s => Some(NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?),
        };
        Some((item, amount, self.category, date))
    }
}

fn parse_rows(bytes: &[u8]) -> csv::Result<Vec<CsvRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(Cursor::new(bytes));
    let rows: csv::Result<Vec<CsvRow>> = reader.deserialize().collect();
    rows
}

/// Seed expenses for running the program in test mode.
const SEED_EXPENSES: &str = r##"Date,Item,Category,Amount
2025-10-03,Rent,Utilities,12000
2025-10-11,Electricity bill,Utilities,1450.50
2025-10-19,Vegetables,Groceries,640
2025-11-01,Rent,Utilities,12000
2025-11-07,Dinner with friends,Food & Dining,2300
2025-11-15,Metro card,Transportation,500
2025-11-22,Pharmacy,Health,385.75
2025-12-01,Rent,Utilities,12000
2025-12-06,Supermarket,Groceries,3120.40
2025-12-14,Movie tickets,Entertainment,700
2025-12-20,Winter jacket,Shopping,4999
"##;

/// Seed salaries for running the program in test mode.
const SEED_SALARIES: &[(&str, i64)] = &[("Oct 2025", 45000), ("Nov 2025", 45000), ("Dec 2025", 47500)];
