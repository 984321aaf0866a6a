//! The incremental list synchronization and balance engine.
//!
//! `SyncCoordinator` owns one session: the active scope (`QueryState`), the records accumulated
//! for it (`RecordStore`) and the balance figures the service computed (`BalanceEngine`). Local
//! state is a read cache. Every write goes to the service and is followed by a full refresh; the
//! cache is never patched in place.
//!
//! Responses can arrive out of order. Each first-page listing bumps a list generation before its
//! request is issued, and each stats or chart request bumps a month generation. A response whose
//! generation is no longer current is dropped.

mod balance;
mod debounce;
mod heartbeat;
mod loading;
mod query;
mod store;

pub use balance::BalanceEngine;
pub use debounce::{Debouncer, Pending};
pub use heartbeat::Heartbeat;
pub use loading::{LoadingGuard, LoadingIndicator};
pub use query::{FetchState, QueryState, ScopeKey};
pub use store::RecordStore;

use crate::api::{ExpenseQuery, ExpenseService};
use crate::model::{
    BalanceHint, BalanceSnapshot, Category, CategoryTotals, DashboardStats, Download,
    ExpenseForm, ExpenseRecord, ImportFile, MonthSelector, PageResult, RecordId, SalaryForm,
};
use crate::{SyncError, SyncResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(2);

/// Tunables for a session, usually taken from the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub page_limit: u32,
    pub debounce: Duration,
    pub heartbeat: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            debounce: DEFAULT_DEBOUNCE,
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }
}

/// The reads that make up a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPart {
    Categories,
    Stats,
    Expenses,
    Chart,
}

serde_plain::derive_display_from_serialize!(RefreshPart);

/// Which of the reads of a refresh failed. The others were applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Refresh {
    failures: Vec<(RefreshPart, SyncError)>,
}

impl Refresh {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self, part: RefreshPart) -> bool {
        self.failures.iter().any(|(p, _)| *p == part)
    }

    pub fn failures(&self) -> &[(RefreshPart, SyncError)] {
        &self.failures
    }

    fn record<T>(&mut self, part: RefreshPart, result: SyncResult<T>) {
        if let Err(e) = result {
            self.failures.push((part, e));
        }
    }
}

/// What `export` should include.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportScope {
    /// The active month only.
    #[default]
    Current,
    All,
}

serde_plain::derive_display_from_serialize!(ExportScope);
serde_plain::derive_fromstr_from_deserialize!(ExportScope);

/// A snapshot of the session for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub records: Vec<ExpenseRecord>,
    pub total: u64,
    pub has_more: bool,
    pub page: u32,
    pub balance: BalanceSnapshot,
    pub hint: BalanceHint,
    pub active_month: Option<MonthSelector>,
    pub month_choices: Vec<MonthSelector>,
    pub search: Option<String>,
    pub categories: Vec<Category>,
    pub category_totals: CategoryTotals,
    pub fetch_state: FetchState,
    pub loading: bool,
    pub last_error: Option<String>,
}

impl SessionView {
    pub fn showing(&self) -> String {
        format!("Showing {} of {}", self.records.len(), self.total)
    }
}

/// A first-page listing request and the generation it was issued under.
#[derive(Debug)]
struct ListTicket {
    generation: u64,
    scope: ScopeKey,
    query: ExpenseQuery,
}

#[derive(Debug, Default)]
struct Session {
    query: QueryState,
    store: RecordStore,
    balance: BalanceEngine,
    categories: Vec<Category>,
    totals: CategoryTotals,
    list_generation: u64,
    /// The generation of the latest first page that settled. Behind `list_generation` while a
    /// first page is in flight.
    store_generation: u64,
    month_generation: u64,
    loading_more: bool,
    last_error: Option<SyncError>,
}

impl Session {
    fn first_page_ticket(&mut self, limit: u32) -> ListTicket {
        self.list_generation += 1;
        self.query.begin_first_page();
        let scope = self.query.scope_key();
        ListTicket {
            generation: self.list_generation,
            query: scope.query(1, limit),
            scope,
        }
    }

    fn read_failed(&mut self, part: RefreshPart, e: &SyncError) {
        warn!("Unable to load {part}: {e}");
        self.last_error = Some(e.clone());
    }

    /// Replaces the store with a first page, unless a newer listing was issued meanwhile.
    fn apply_first_page(&mut self, ticket: ListTicket, result: SyncResult<PageResult>) -> SyncResult<bool> {
        if ticket.generation != self.list_generation {
            debug!("Discarding stale listing for {:?}", ticket.scope);
            return Ok(false);
        }
        self.store_generation = ticket.generation;
        self.query.first_page_settled();
        match result {
            Ok(page) => {
                self.query.set_page(page.page);
                self.store.replace(ticket.scope, page);
                Ok(true)
            }
            Err(e) => {
                self.read_failed(RefreshPart::Expenses, &e);
                Err(e)
            }
        }
    }

    fn apply_stats(
        &mut self,
        generation: u64,
        requested: Option<&MonthSelector>,
        result: SyncResult<DashboardStats>,
    ) -> SyncResult<()> {
        if generation != self.month_generation {
            debug!("Discarding stale stats for {requested:?}");
            return Ok(());
        }
        match result {
            Ok(stats) => {
                if let Some(month) = self.balance.apply(requested, stats) {
                    self.query.adopt_month(month);
                }
                Ok(())
            }
            Err(e) => {
                self.read_failed(RefreshPart::Stats, &e);
                Err(e)
            }
        }
    }

    fn apply_totals(&mut self, generation: u64, result: SyncResult<CategoryTotals>) -> SyncResult<()> {
        if generation != self.month_generation {
            debug!("Discarding stale category totals");
            return Ok(());
        }
        match result {
            Ok(totals) => {
                self.totals = totals;
                Ok(())
            }
            Err(e) => {
                self.read_failed(RefreshPart::Chart, &e);
                Err(e)
            }
        }
    }

    fn apply_categories(&mut self, result: SyncResult<Vec<Category>>) -> SyncResult<()> {
        match result {
            Ok(categories) => {
                self.categories = categories;
                Ok(())
            }
            Err(e) => {
                self.read_failed(RefreshPart::Categories, &e);
                Err(e)
            }
        }
    }
}

/// Orchestrates the round-trips of one session. Clones share the session.
#[derive(Clone)]
pub struct SyncCoordinator {
    service: Arc<dyn ExpenseService>,
    settings: SyncSettings,
    session: Arc<Mutex<Session>>,
    debouncer: Debouncer,
    loading: LoadingIndicator,
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SyncCoordinator {
    pub fn new(service: Arc<dyn ExpenseService>, settings: SyncSettings) -> Self {
        Self {
            service,
            settings,
            session: Arc::new(Mutex::new(Session::default())),
            debouncer: Debouncer::new(settings.debounce),
            loading: LoadingIndicator::new(),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn loading(&self) -> &LoadingIndicator {
        &self.loading
    }

    /// Starts the keep-alive for this session's service.
    pub fn heartbeat(&self) -> Heartbeat {
        Heartbeat::spawn(self.service.clone(), self.settings.heartbeat)
    }

    /// Fetches categories, stats, the first page of expenses and the category totals at the same
    /// time. Each read succeeds or fails on its own; failed reads leave their part of the session
    /// as it was.
    pub async fn refresh_all(&self) -> Refresh {
        let _loading = self.loading.show();
        let (ticket, month_generation, month) = {
            let mut session = self.session.lock().await;
            session.last_error = None;
            let ticket = session.first_page_ticket(self.settings.page_limit);
            session.month_generation += 1;
            let month = session.query.month().cloned();
            (ticket, session.month_generation, month)
        };

        let service = &self.service;
        let (categories, stats, page, totals) = tokio::join!(
            service.list_categories(),
            service.dashboard_stats(month.as_ref()),
            service.list_expenses(&ticket.query),
            service.category_totals(month.as_ref()),
        );

        let mut session = self.session.lock().await;
        let mut refresh = Refresh::default();
        let result = session.apply_categories(categories);
        refresh.record(RefreshPart::Categories, result);
        let result = session.apply_stats(month_generation, month.as_ref(), stats);
        refresh.record(RefreshPart::Stats, result);
        let result = session.apply_first_page(ticket, page);
        refresh.record(RefreshPart::Expenses, result);
        let result = session.apply_totals(month_generation, totals);
        refresh.record(RefreshPart::Chart, result);
        session.query.settle(refresh.is_ok());
        refresh
    }

    /// Sets the month scope and refreshes everything. `None` lets the service pick its default.
    pub async fn select_month(&self, month: Option<MonthSelector>) -> Refresh {
        self.session.lock().await.query.set_month(month);
        self.refresh_all().await
    }

    /// Sets the search text and fetches the first page of the new scope right away. Returns
    /// whether the response was applied; a response overtaken by a newer listing is dropped.
    pub async fn search(&self, text: &str) -> SyncResult<bool> {
        let ticket = {
            let mut session = self.session.lock().await;
            session.last_error = None;
            session.query.set_search(text);
            session.first_page_ticket(self.settings.page_limit)
        };
        let result = self.service.list_expenses(&ticket.query).await;
        let mut session = self.session.lock().await;
        let applied = session.apply_first_page(ticket, result);
        match &applied {
            Ok(true) => session.query.settle(true),
            Ok(false) => {}
            Err(_) => session.query.settle(false),
        }
        applied
    }

    /// Like `search`, after the debounce delay. A call made while an earlier one is still
    /// waiting supersedes it; the superseded call returns `Ok(false)` without fetching.
    ///
    /// The call claims its place when it is made, not when the returned future is first polled,
    /// so the returned future can be spawned.
    pub fn debounced_search(
        &self,
        text: &str,
    ) -> impl Future<Output = SyncResult<bool>> + Send + 'static {
        let pending = self.debouncer.pending();
        let sync = self.clone();
        let text = text.to_string();
        async move {
            if !pending.settle().await {
                return Ok(false);
            }
            sync.search(&text).await
        }
    }

    /// Appends the next page of the accumulated scope. Does nothing, returning `Ok(false)`, when
    /// there is no next page, a load is already in flight, or the first page of a new scope is still
    /// on its way.
    pub async fn load_more(&self) -> SyncResult<bool> {
        let (generation, query) = {
            let mut session = self.session.lock().await;
            let Some(next) = session.store.next_page() else {
                return Ok(false);
            };
            if session.loading_more {
                return Ok(false);
            }
            if session.query.is_dirty() {
                debug!("Not loading page {next} while the scope is changing");
                return Ok(false);
            }
            session.loading_more = true;
            session.query.begin();
            let scope = session.store.scope().cloned().unwrap_or_default();
            (
                session.store_generation,
                scope.query(next, self.settings.page_limit),
            )
        };

        let result = self.service.list_expenses(&query).await;

        let mut session = self.session.lock().await;
        session.loading_more = false;
        if generation != session.list_generation {
            debug!("Discarding stale page {} for {:?}", query.page, query.search);
            return Ok(false);
        }
        match result {
            Ok(page) => {
                session.query.set_page(page.page);
                session.store.append(page);
                session.query.settle(true);
                Ok(true)
            }
            Err(e) => {
                session.read_failed(RefreshPart::Expenses, &e);
                session.query.settle(false);
                Err(e)
            }
        }
    }

    /// Reloads the category list only.
    pub async fn reload_categories(&self) -> SyncResult<()> {
        let result = self.service.list_categories().await;
        self.session.lock().await.apply_categories(result)
    }

    pub async fn create_expense(&self, form: &ExpenseForm) -> SyncResult<Refresh> {
        let draft = form.validate()?;
        let _loading = self.loading.show();
        self.service.create_expense(&draft).await?;
        Ok(self.refresh_all().await)
    }

    pub async fn update_expense(&self, id: &RecordId, form: &ExpenseForm) -> SyncResult<Refresh> {
        let draft = form.validate()?;
        let _loading = self.loading.show();
        self.service.update_expense(id, &draft).await?;
        Ok(self.refresh_all().await)
    }

    pub async fn delete_expense(&self, id: &RecordId) -> SyncResult<Refresh> {
        let _loading = self.loading.show();
        self.service.delete_expense(id).await?;
        Ok(self.refresh_all().await)
    }

    /// Deletes every expense and salary entry.
    pub async fn clear_all(&self) -> SyncResult<Refresh> {
        let _loading = self.loading.show();
        self.service.clear_expenses().await?;
        Ok(self.refresh_all().await)
    }

    pub async fn save_salary(&self, form: &SalaryForm) -> SyncResult<Refresh> {
        let salary = form.validate()?;
        let _loading = self.loading.show();
        self.service.save_salary(&salary).await?;
        Ok(self.refresh_all().await)
    }

    /// Uploads a file for bulk import. Returns the service's message. Importing the same file
    /// twice imports it twice.
    pub async fn import(&self, file: &ImportFile) -> SyncResult<(String, Refresh)> {
        file.validate()?;
        let _loading = self.loading.show();
        let message = self.service.import(file).await?;
        Ok((message, self.refresh_all().await))
    }

    pub async fn create_category(&self, name: &str) -> SyncResult<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SyncError::validation("Enter a category name"));
        }
        let category = {
            let _loading = self.loading.show();
            self.service.create_category(name).await?
        };
        // The category exists now even if the reload fails; the failure is in `last_error`.
        let _ = self.reload_categories().await;
        Ok(category)
    }

    pub async fn delete_category(&self, id: &RecordId) -> SyncResult<()> {
        {
            let _loading = self.loading.show();
            self.service.delete_category(id).await?;
        }
        let _ = self.reload_categories().await;
        Ok(())
    }

    /// Downloads the expenses of the active month, or of all months.
    pub async fn export(&self, scope: ExportScope) -> SyncResult<Download> {
        let month = match scope {
            ExportScope::Current => self.session.lock().await.query.month().cloned(),
            ExportScope::All => None,
        };
        let _loading = self.loading.show();
        self.service.export(month.as_ref()).await
    }

    /// An edit form pre-filled from a loaded record. Undated records get `today`.
    pub async fn edit_draft(&self, id: &RecordId, today: NaiveDate) -> Option<ExpenseForm> {
        let session = self.session.lock().await;
        let record = session.store.find(id)?;
        Some(prefill(record, record.date().unwrap_or(today)))
    }

    /// A create form copying a loaded record, dated `today`.
    pub async fn duplicate_draft(&self, id: &RecordId, today: NaiveDate) -> Option<ExpenseForm> {
        let session = self.session.lock().await;
        session.store.find(id).map(|record| prefill(record, today))
    }

    pub async fn view(&self) -> SessionView {
        let session = self.session.lock().await;
        SessionView {
            records: session.store.items().to_vec(),
            total: session.store.total(),
            has_more: session.store.has_next(),
            page: session.query.page(),
            balance: session.balance.snapshot().clone(),
            hint: session.balance.hint(),
            active_month: session.query.month().cloned(),
            month_choices: session.balance.month_choices(),
            search: session.query.search().map(str::to_string),
            categories: session.categories.clone(),
            category_totals: session.totals.clone(),
            fetch_state: session.query.fetch_state(),
            loading: self.loading.is_visible(),
            last_error: session.last_error.as_ref().map(ToString::to_string),
        }
    }
}

fn prefill(record: &ExpenseRecord, date: NaiveDate) -> ExpenseForm {
    ExpenseForm {
        item: record.item().to_string(),
        amount: record.amount().to_string(),
        category: Some(record.category().to_string()),
        date: Some(date),
    }
}
