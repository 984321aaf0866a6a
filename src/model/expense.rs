use crate::error::{SyncError, SyncResult};
use crate::model::month::{self, MonthSelector};
use crate::model::Amount;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The category used when a record or form does not name one.
pub const DEFAULT_CATEGORY: &str = "General";

/// An identifier assigned by the expense service. Depending on the service's storage it arrives
/// as an integer or as a string; either way it is opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "WireId", into = "String")]
pub struct RecordId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(i64),
    Text(String),
}

impl From<WireId> for RecordId {
    fn from(value: WireId) -> Self {
        match value {
            WireId::Number(n) => RecordId(n.to_string()),
            WireId::Text(s) => RecordId(s),
        }
    }
}

impl From<RecordId> for String {
    fn from(value: RecordId) -> Self {
        value.0
    }
}

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().to_string()))
    }
}

/// A single expense as the service reports it.
///
/// Every record carries a date, a month label, or both. A record with neither is rejected when it
/// is decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireExpense")]
pub struct ExpenseRecord {
    id: RecordId,
    item: String,
    amount: Amount,
    category: String,
    date: Option<NaiveDate>,
    month: Option<MonthSelector>,
}

impl ExpenseRecord {
    pub(crate) fn new(
        id: RecordId,
        item: impl Into<String>,
        amount: Amount,
        category: impl Into<String>,
        date: Option<NaiveDate>,
        month: MonthSelector,
    ) -> Self {
        Self {
            id,
            item: item.into(),
            amount,
            category: category_or_default(Some(category.into())),
            date,
            month: Some(month),
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn item(&self) -> &str {
        &self.item
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn month(&self) -> Option<&MonthSelector> {
        self.month.as_ref()
    }

    /// `DD MM YYYY` when the record is dated, otherwise its month label.
    pub fn display_date(&self) -> String {
        match (self.date, &self.month) {
            (Some(date), _) => date.format("%d %m %Y").to_string(),
            (None, Some(month)) => month.to_string(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Deserialize)]
struct WireExpense {
    id: RecordId,
    #[serde(default)]
    item: Option<String>,
    #[serde(default)]
    amount: Amount,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default, deserialize_with = "month::optional")]
    month: Option<MonthSelector>,
}

impl TryFrom<WireExpense> for ExpenseRecord {
    type Error = String;

    fn try_from(wire: WireExpense) -> Result<Self, Self::Error> {
        let date = wire
            .date
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
        if date.is_none() && wire.month.is_none() {
            return Err(format!("expense {} has neither a date nor a month", wire.id));
        }
        Ok(Self {
            id: wire.id,
            item: wire.item.unwrap_or_default(),
            amount: wire.amount,
            category: category_or_default(wire.category),
            date,
            month: wire.month,
        })
    }
}

fn category_or_default(category: Option<String>) -> String {
    category
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

/// A named expense category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: RecordId,
    pub name: String,
}

/// One page of the expense listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    #[serde(default)]
    pub items: Vec<ExpenseRecord>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub has_next: bool,
    /// The size of the whole scope, independent of the page size.
    #[serde(default)]
    pub total: u64,
}

fn first_page() -> u32 {
    1
}

/// User input for creating or editing an expense, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseForm {
    pub item: String,
    pub amount: String,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
}

impl ExpenseForm {
    /// Checks the required fields and produces the request body. Nothing is sent on failure.
    pub fn validate(&self) -> SyncResult<ExpenseDraft> {
        let item = self.item.trim();
        let amount = self.amount.trim();
        let date = match self.date {
            Some(date) if !item.is_empty() && !amount.is_empty() => date,
            _ => return Err(SyncError::validation("Fill all fields")),
        };
        let amount = parse_amount(amount)?;
        Ok(ExpenseDraft {
            item: item.to_string(),
            amount,
            category: category_or_default(self.category.clone()),
            date,
        })
    }
}

/// The body of a create or update expense request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseDraft {
    pub item: String,
    pub amount: Amount,
    pub category: String,
    pub date: NaiveDate,
}

/// User input for recording the salary of a month, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalaryForm {
    pub month: MonthSelector,
    pub amount: String,
}

impl SalaryForm {
    pub fn validate(&self) -> SyncResult<SalaryEntry> {
        let amount = self.amount.trim();
        if amount.is_empty() {
            return Err(SyncError::validation("Invalid amount"));
        }
        Ok(SalaryEntry {
            month: self.month.clone(),
            amount: parse_amount(amount)?,
        })
    }
}

/// The body of a save salary request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryEntry {
    pub month: MonthSelector,
    pub amount: Amount,
}

fn parse_amount(s: &str) -> SyncResult<Amount> {
    match Amount::from_str(s) {
        Ok(amount) if !amount.is_negative() => Ok(amount),
        _ => Err(SyncError::validation("Invalid amount")),
    }
}

/// A file to upload to the bulk import endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImportFile {
    pub fn validate(&self) -> SyncResult<()> {
        if self.bytes.is_empty() {
            return Err(SyncError::validation("Select a file"));
        }
        Ok(())
    }
}

/// A file produced by the export endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_integer_id_with_defaults() {
        let json = r#"{"id": 7, "item": "Tea", "amount": 20, "category": null,
                       "date": "2025-12-14", "month": "Dec 2025"}"#;
        let record: ExpenseRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id().as_str(), "7");
        assert_eq!(record.category(), DEFAULT_CATEGORY);
        assert_eq!(record.display_date(), "14 12 2025");
        assert_eq!(record.amount(), Amount::from(20));
    }

    #[test]
    fn decode_string_id_month_only() {
        let json = r#"{"id": "65a1f0", "item": "Rent", "amount": 1500.5, "month": "Nov 2025"}"#;
        let record: ExpenseRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id().as_str(), "65a1f0");
        assert!(record.date().is_none());
        assert_eq!(record.display_date(), "Nov 2025");
    }

    #[test]
    fn decode_rejects_record_without_date_or_month() {
        let json = r#"{"id": 1, "item": "Ghost", "amount": 1, "date": null, "month": ""}"#;
        let result: Result<ExpenseRecord, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn decode_page_result() {
        let json = r#"{"items": [{"id": 1, "item": "A", "amount": 1, "month": "Dec 2025"}],
                       "page": 2, "has_next": true, "total": 51, "pages": 2}"#;
        let page: PageResult = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.page, 2);
        assert!(page.has_next);
        assert_eq!(page.total, 51);
    }

    #[test]
    fn form_requires_all_fields() {
        let form = ExpenseForm {
            item: "Tea".into(),
            amount: "".into(),
            category: None,
            date: NaiveDate::from_ymd_opt(2025, 12, 1),
        };
        assert_eq!(
            form.validate().unwrap_err(),
            SyncError::Validation("Fill all fields".into())
        );

        let form = ExpenseForm {
            item: "  ".into(),
            amount: "10".into(),
            ..form
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn form_rejects_bad_amounts() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 1);
        for amount in ["abc", "-5", "abc12", "12 rupees"] {
            let form = ExpenseForm {
                item: "Tea".into(),
                amount: amount.into(),
                category: None,
                date,
            };
            assert_eq!(
                form.validate().unwrap_err(),
                SyncError::Validation("Invalid amount".into())
            );
        }
    }

    #[test]
    fn form_builds_draft_body() {
        let form = ExpenseForm {
            item: " Groceries ".into(),
            amount: "1,250.75".into(),
            category: Some("".into()),
            date: NaiveDate::from_ymd_opt(2025, 12, 14),
        };
        let draft = form.validate().unwrap();
        let body = serde_json::to_value(&draft).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "item": "Groceries",
                "amount": "1250.75",
                "category": "General",
                "date": "2025-12-14"
            })
        );
    }

    #[test]
    fn salary_requires_amount() {
        let form = SalaryForm {
            month: MonthSelector::new("Dec 2025").unwrap(),
            amount: " ".into(),
        };
        assert!(form.validate().is_err());
        let form = SalaryForm {
            amount: "5000".into(),
            ..form
        };
        let entry = form.validate().unwrap();
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            serde_json::json!({"month": "Dec 2025", "amount": "5000"})
        );
    }
}
