//! The seam between the sync engine and the remote expense service.
//!
//! `ExpenseService` is implemented by `HttpService`, which talks JSON over HTTP to a running
//! service, and by `MemoryService`, which keeps everything in memory. Which one the program uses
//! is decided by `Mode`.

mod http;
mod memory;

use crate::model::{
    Category, CategoryTotals, DashboardStats, Download, ExpenseDraft, ImportFile, MonthSelector,
    PageResult, RecordId, SalaryEntry,
};
use crate::{Config, Result, SyncResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use http::HttpService;
pub use memory::{MemoryService, Request};

/// When this environment variable is set and non-empty, the program runs against an in-memory
/// service instead of the configured URL.
const TEST_MODE_ENV: &str = "EXPENSE_SYNC_IN_TEST_MODE";

/// Whether the program talks to a real service or to an in-memory one.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Mode {
    #[default]
    Http,
    Test,
}

impl Mode {
    /// Checks `EXPENSE_SYNC_IN_TEST_MODE` and returns `Mode::Test` if it is set and non-empty.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Http,
        }
    }
}

/// Creates the service implementation for `mode`.
pub fn service(config: &Config, mode: Mode) -> Result<Arc<dyn ExpenseService>> {
    Ok(match mode {
        Mode::Http => Arc::new(HttpService::new(config.base_url().clone())?),
        Mode::Test => Arc::new(MemoryService::default()),
    })
}

/// The operations of the remote expense service.
///
/// Every method maps to exactly one request. A 2xx answer is `Ok`; anything else is a
/// `SyncError::Service` carrying the service's `error` message.
#[async_trait::async_trait]
pub trait ExpenseService: Send + Sync {
    async fn list_categories(&self) -> SyncResult<Vec<Category>>;

    async fn create_category(&self, name: &str) -> SyncResult<Category>;

    async fn delete_category(&self, id: &RecordId) -> SyncResult<()>;

    /// With `month` absent the service picks its default month and reports it back in
    /// `current_filter`.
    async fn dashboard_stats(&self, month: Option<&MonthSelector>) -> SyncResult<DashboardStats>;

    async fn list_expenses(&self, query: &ExpenseQuery) -> SyncResult<PageResult>;

    async fn create_expense(&self, draft: &ExpenseDraft) -> SyncResult<()>;

    async fn update_expense(&self, id: &RecordId, draft: &ExpenseDraft) -> SyncResult<()>;

    async fn delete_expense(&self, id: &RecordId) -> SyncResult<()>;

    /// Deletes every expense and salary entry.
    async fn clear_expenses(&self) -> SyncResult<()>;

    async fn save_salary(&self, salary: &SalaryEntry) -> SyncResult<()>;

    async fn category_totals(&self, month: Option<&MonthSelector>) -> SyncResult<CategoryTotals>;

    /// Uploads a file for bulk import and returns the service's message.
    async fn import(&self, file: &ImportFile) -> SyncResult<String>;

    async fn export(&self, month: Option<&MonthSelector>) -> SyncResult<Download>;

    async fn heartbeat(&self) -> SyncResult<()>;
}

/// The endpoints of the expense service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    ListCategories,
    CreateCategory,
    DeleteCategory,
    DashboardStats,
    ListExpenses,
    CreateExpense,
    UpdateExpense,
    DeleteExpense,
    ClearExpenses,
    SaveSalary,
    CategoryTotals,
    Import,
    Export,
    Heartbeat,
}

serde_plain::derive_display_from_serialize!(Endpoint);

impl Endpoint {
    pub fn method(&self) -> reqwest::Method {
        use reqwest::Method;
        match self {
            Endpoint::ListCategories
            | Endpoint::DashboardStats
            | Endpoint::ListExpenses
            | Endpoint::CategoryTotals
            | Endpoint::Export => Method::GET,
            Endpoint::CreateCategory
            | Endpoint::CreateExpense
            | Endpoint::SaveSalary
            | Endpoint::Import
            | Endpoint::Heartbeat => Method::POST,
            Endpoint::UpdateExpense => Method::PUT,
            Endpoint::DeleteCategory | Endpoint::DeleteExpense | Endpoint::ClearExpenses => {
                Method::DELETE
            }
        }
    }

    /// The request path. `id` is used by the endpoints that address a single record.
    pub fn path(&self, id: Option<&RecordId>) -> String {
        let id = id.map(RecordId::as_str).unwrap_or_default();
        match self {
            Endpoint::ListCategories | Endpoint::CreateCategory => "/categories".to_string(),
            Endpoint::DeleteCategory => format!("/categories/{id}"),
            Endpoint::DashboardStats => "/dashboard-stats".to_string(),
            Endpoint::ListExpenses | Endpoint::CreateExpense | Endpoint::ClearExpenses => {
                "/expenses".to_string()
            }
            Endpoint::UpdateExpense | Endpoint::DeleteExpense => format!("/expenses/{id}"),
            Endpoint::SaveSalary => "/salary".to_string(),
            Endpoint::CategoryTotals => "/stats/category".to_string(),
            Endpoint::Import => "/import".to_string(),
            Endpoint::Export => "/export".to_string(),
            Endpoint::Heartbeat => "/heartbeat".to_string(),
        }
    }
}

/// The parameters of one expense listing request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpenseQuery {
    /// 1-based.
    pub page: u32,
    pub limit: u32,
    pub month: Option<MonthSelector>,
    pub search: Option<String>,
}

impl ExpenseQuery {
    /// The query string pairs. Absent month and search are left out entirely.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", self.page.to_string()), ("limit", self.limit.to_string())];
        if let Some(month) = &self.month {
            params.push(("month", month.to_string()));
        }
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        params
    }
}

/// The optional `?month=` parameter shared by stats, category totals and export.
pub(crate) fn month_param(month: Option<&MonthSelector>) -> Vec<(&'static str, String)> {
    month
        .map(|m| vec![("month", m.to_string())])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_skip_absent_scope() {
        let query = ExpenseQuery {
            page: 1,
            limit: 50,
            month: None,
            search: None,
        };
        assert_eq!(
            query.params(),
            vec![("page", "1".to_string()), ("limit", "50".to_string())]
        );

        let query = ExpenseQuery {
            page: 3,
            limit: 50,
            month: MonthSelector::new("Dec 2025"),
            search: Some("tea".into()),
        };
        let params = query.params();
        assert!(params.contains(&("month", "Dec 2025".to_string())));
        assert!(params.contains(&("search", "tea".to_string())));
    }

    #[test]
    fn endpoint_routes() {
        let id = RecordId::new("12");
        assert_eq!(Endpoint::UpdateExpense.method(), reqwest::Method::PUT);
        assert_eq!(Endpoint::UpdateExpense.path(Some(&id)), "/expenses/12");
        assert_eq!(Endpoint::ClearExpenses.method(), reqwest::Method::DELETE);
        assert_eq!(Endpoint::ClearExpenses.path(None), "/expenses");
        assert_eq!(Endpoint::DeleteCategory.path(Some(&id)), "/categories/12");
        assert_eq!(Endpoint::CategoryTotals.path(None), "/stats/category");
        assert_eq!(Endpoint::Heartbeat.to_string(), "heartbeat");
    }

    #[test]
    fn mode_defaults_to_http() {
        assert_eq!(Mode::default(), Mode::Http);
    }
}
