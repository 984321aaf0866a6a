//! Types that represent the data model, such as `ExpenseRecord` and `BalanceSnapshot`.
mod amount;
mod expense;
pub(crate) mod month;
mod stats;

pub use amount::{Amount, AmountError, AmountStyle, Grouping, DEFAULT_GLYPH};
pub use expense::{
    Category, Download, ExpenseDraft, ExpenseForm, ExpenseRecord, ImportFile, PageResult,
    RecordId, SalaryEntry, SalaryForm, DEFAULT_CATEGORY,
};
pub use month::MonthSelector;
pub use stats::{BalanceHint, BalanceSnapshot, CategoryTotals, DashboardStats};
