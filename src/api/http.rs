//! Implements `ExpenseService` with JSON over HTTP using `reqwest`.

use crate::api::{month_param, Endpoint, ExpenseQuery, ExpenseService};
use crate::model::{
    Category, CategoryTotals, DashboardStats, Download, ExpenseDraft, ImportFile, MonthSelector,
    PageResult, RecordId, SalaryEntry,
};
use crate::{Result, SyncError, SyncResult};
use anyhow::Context;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::trace;
use url::Url;

/// Talks to a running expense service at `base_url`.
#[derive(Debug, Clone)]
pub struct HttpService {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct NewCategory<'a> {
    name: &'a str,
}

impl HttpService {
    pub fn new(base_url: Url) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Unable to create the HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, endpoint: Endpoint, id: Option<&RecordId>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, endpoint.path(id));
        trace!("{} {url}", endpoint.method());
        self.client.request(endpoint.method(), url)
    }

    /// Sends the request and partitions the answer into success (2xx) and `SyncError::Service`.
    async fn send(&self, request: RequestBuilder) -> SyncResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("server error")
                .to_string(),
        };
        Err(SyncError::service(status.as_u16(), message))
    }

    async fn get_json<T>(&self, endpoint: Endpoint, params: &[(&str, String)]) -> SyncResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(self.request(endpoint, None).query(params)).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait::async_trait]
impl ExpenseService for HttpService {
    async fn list_categories(&self) -> SyncResult<Vec<Category>> {
        self.get_json(Endpoint::ListCategories, &[]).await
    }

    async fn create_category(&self, name: &str) -> SyncResult<Category> {
        let request = self
            .request(Endpoint::CreateCategory, None)
            .json(&NewCategory { name });
        Ok(self.send(request).await?.json().await?)
    }

    async fn delete_category(&self, id: &RecordId) -> SyncResult<()> {
        self.send(self.request(Endpoint::DeleteCategory, Some(id)))
            .await?;
        Ok(())
    }

    async fn dashboard_stats(&self, month: Option<&MonthSelector>) -> SyncResult<DashboardStats> {
        self.get_json(Endpoint::DashboardStats, &month_param(month))
            .await
    }

    async fn list_expenses(&self, query: &ExpenseQuery) -> SyncResult<PageResult> {
        self.get_json(Endpoint::ListExpenses, &query.params()).await
    }

    async fn create_expense(&self, draft: &ExpenseDraft) -> SyncResult<()> {
        self.send(self.request(Endpoint::CreateExpense, None).json(draft))
            .await?;
        Ok(())
    }

    async fn update_expense(&self, id: &RecordId, draft: &ExpenseDraft) -> SyncResult<()> {
        self.send(self.request(Endpoint::UpdateExpense, Some(id)).json(draft))
            .await?;
        Ok(())
    }

    async fn delete_expense(&self, id: &RecordId) -> SyncResult<()> {
        self.send(self.request(Endpoint::DeleteExpense, Some(id)))
            .await?;
        Ok(())
    }

    async fn clear_expenses(&self) -> SyncResult<()> {
        self.send(self.request(Endpoint::ClearExpenses, None))
            .await?;
        Ok(())
    }

    async fn save_salary(&self, salary: &SalaryEntry) -> SyncResult<()> {
        self.send(self.request(Endpoint::SaveSalary, None).json(salary))
            .await?;
        Ok(())
    }

    async fn category_totals(&self, month: Option<&MonthSelector>) -> SyncResult<CategoryTotals> {
        self.get_json(Endpoint::CategoryTotals, &month_param(month))
            .await
    }

    async fn import(&self, file: &ImportFile) -> SyncResult<String> {
        let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        let form = Form::new().part("file", part);
        let request = self.request(Endpoint::Import, None).multipart(form);
        let body: MessageBody = self.send(request).await?.json().await?;
        Ok(body.message)
    }

    async fn export(&self, month: Option<&MonthSelector>) -> SyncResult<Download> {
        let request = self
            .request(Endpoint::Export, None)
            .query(&month_param(month));
        let response = self.send(request).await?;
        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_file_name)
            .unwrap_or_else(|| default_export_name(month));
        let bytes = response.bytes().await?.to_vec();
        Ok(Download { file_name, bytes })
    }

    async fn heartbeat(&self) -> SyncResult<()> {
        self.send(self.request(Endpoint::Heartbeat, None)).await?;
        Ok(())
    }
}

/// Pulls `filename` out of a `Content-Disposition: attachment; filename=...` header.
fn attachment_file_name(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

/// The name the service gives its export when it does not send one.
fn default_export_name(month: Option<&MonthSelector>) -> String {
    match month {
        Some(month) => format!("Expenses_{month}.xlsx"),
        None => "All_Expenses.xlsx".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_from_content_disposition() {
        assert_eq!(
            attachment_file_name(r#"attachment; filename="Expenses_Dec 2025.xlsx""#).as_deref(),
            Some("Expenses_Dec 2025.xlsx")
        );
        assert_eq!(
            attachment_file_name("attachment; filename=All_Expenses.xlsx").as_deref(),
            Some("All_Expenses.xlsx")
        );
        assert_eq!(attachment_file_name("inline"), None);
    }

    #[test]
    fn default_export_names() {
        let month = MonthSelector::new("Dec 2025");
        assert_eq!(default_export_name(month.as_ref()), "Expenses_Dec 2025.xlsx");
        assert_eq!(default_export_name(None), "All_Expenses.xlsx");
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let service = HttpService::new(Url::parse("http://127.0.0.1:8000/").unwrap()).unwrap();
        assert_eq!(service.base_url, "http://127.0.0.1:8000");
    }
}
