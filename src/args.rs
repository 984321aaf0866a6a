//! These structs provide the CLI interface for the expense CLI.

use crate::model::{MonthSelector, RecordId};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// expense: A command-line client for a personal expense tracking service.
///
/// The service holds your expenses, categories and monthly salary. This program lists and
/// searches your expenses page by page, shows the monthly balance the service computes (salary
/// minus expenses, carried forward from earlier months) and sends your changes back.
///
/// Set EXPENSE_SYNC_IN_TEST_MODE to any value to run against a built-in in-memory service.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and the configuration file.
    ///
    /// This is the first command you should run. Pass the root URL of your expense service as
    /// --base-url. Everything else starts with defaults that you can change in config.json.
    Init(InitArgs),
    /// Show the balance, the category totals and the first page(s) of expenses.
    Dashboard(DashboardArgs),
    /// Add an expense.
    Add(ExpenseArgs),
    /// Change an expense. Fields you leave out keep their current values.
    Edit(EditArgs),
    /// Add a copy of an expense, dated today unless --date is given.
    Duplicate(DuplicateArgs),
    /// Delete an expense.
    Delete(IdArgs),
    /// Delete all expenses and salaries.
    Clear(ClearArgs),
    /// Record the salary for a month.
    Salary(SalaryArgs),
    /// List, add or delete categories.
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Upload a file of expenses for bulk import.
    Import(ImportArgs),
    /// Download expenses to a file.
    Export(ExportArgs),
    /// Start an interactive session that reads commands from stdin.
    Session(ScopeArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the configuration is held. Defaults to ~/expense-sync
    #[arg(long, env = "EXPENSE_HOME", default_value_t = default_expense_home())]
    expense_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, expense_home: PathBuf) -> Self {
        Self {
            log_level,
            expense_home: expense_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn expense_home(&self) -> &DisplayPath {
        &self.expense_home
    }
}

#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The root URL of the expense service, e.g. http://127.0.0.1:5000
    #[arg(long)]
    base_url: String,
}

impl InitArgs {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// The month and search that scope a listing.
#[derive(Debug, Parser, Clone, Default)]
pub struct ScopeArgs {
    /// The month to show, e.g. "Dec 2025". The service picks the current month when omitted.
    #[arg(long)]
    month: Option<String>,

    /// Only show expenses whose item contains this text.
    #[arg(long)]
    search: Option<String>,
}

impl ScopeArgs {
    pub fn new(month: Option<String>, search: Option<String>) -> Self {
        Self { month, search }
    }

    pub fn month(&self) -> Option<MonthSelector> {
        self.month.as_deref().and_then(MonthSelector::new)
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }
}

#[derive(Debug, Parser, Clone)]
pub struct DashboardArgs {
    #[clap(flatten)]
    scope: ScopeArgs,

    /// How many pages of expenses to load.
    #[arg(long, default_value_t = 1)]
    pages: u32,
}

impl DashboardArgs {
    pub fn new(scope: ScopeArgs, pages: u32) -> Self {
        Self { scope, pages }
    }

    pub fn scope(&self) -> &ScopeArgs {
        &self.scope
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }
}

/// The fields of an expense.
#[derive(Debug, Parser, Clone, Default)]
pub struct ExpenseArgs {
    #[arg(long)]
    item: Option<String>,

    #[arg(long)]
    amount: Option<String>,

    #[arg(long)]
    category: Option<String>,

    /// YYYY-MM-DD
    #[arg(long)]
    date: Option<NaiveDate>,
}

impl ExpenseArgs {
    pub fn new(
        item: Option<String>,
        amount: Option<String>,
        category: Option<String>,
        date: Option<NaiveDate>,
    ) -> Self {
        Self {
            item,
            amount,
            category,
            date,
        }
    }

    pub fn item(&self) -> Option<&str> {
        self.item.as_deref()
    }

    pub fn amount(&self) -> Option<&str> {
        self.amount.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }
}

#[derive(Debug, Parser, Clone)]
pub struct EditArgs {
    /// The ID of the expense.
    id: RecordId,

    /// The month the expense is in, which narrows the search for it.
    #[arg(long)]
    month: Option<String>,

    #[clap(flatten)]
    fields: ExpenseArgs,
}

impl EditArgs {
    pub fn new(id: RecordId, month: Option<String>, fields: ExpenseArgs) -> Self {
        Self { id, month, fields }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn month(&self) -> Option<MonthSelector> {
        self.month.as_deref().and_then(MonthSelector::new)
    }

    pub fn fields(&self) -> &ExpenseArgs {
        &self.fields
    }
}

#[derive(Debug, Parser, Clone)]
pub struct DuplicateArgs {
    /// The ID of the expense to copy.
    id: RecordId,

    /// The month the expense is in, which narrows the search for it.
    #[arg(long)]
    month: Option<String>,

    /// The date of the copy. Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
}

impl DuplicateArgs {
    pub fn new(id: RecordId, month: Option<String>, date: Option<NaiveDate>) -> Self {
        Self { id, month, date }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn month(&self) -> Option<MonthSelector> {
        self.month.as_deref().and_then(MonthSelector::new)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }
}

#[derive(Debug, Parser, Clone)]
pub struct IdArgs {
    id: RecordId,
}

impl IdArgs {
    pub fn new(id: RecordId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }
}

#[derive(Debug, Parser, Clone)]
pub struct ClearArgs {
    /// Required. Clearing cannot be undone.
    #[arg(long)]
    yes: bool,
}

impl ClearArgs {
    pub fn new(yes: bool) -> Self {
        Self { yes }
    }

    pub fn yes(&self) -> bool {
        self.yes
    }
}

#[derive(Debug, Parser, Clone)]
pub struct SalaryArgs {
    /// The month, e.g. "Dec 2025".
    #[arg(long)]
    month: MonthSelector,

    #[arg(long)]
    amount: String,
}

impl SalaryArgs {
    pub fn new(month: MonthSelector, amount: impl Into<String>) -> Self {
        Self {
            month,
            amount: amount.into(),
        }
    }

    pub fn month(&self) -> &MonthSelector {
        &self.month
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommand {
    /// List the categories.
    List,
    /// Add a category.
    Add(CategoryNameArgs),
    /// Delete a category by ID.
    Delete(IdArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct CategoryNameArgs {
    name: String,
}

impl CategoryNameArgs {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Parser, Clone)]
pub struct ImportArgs {
    /// The file to upload.
    file: PathBuf,
}

impl ImportArgs {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

#[derive(Debug, Parser, Clone)]
pub struct ExportArgs {
    /// Export every month instead of one.
    #[arg(long)]
    all: bool,

    /// The month to export. The service picks the current month when omitted.
    #[arg(long, conflicts_with = "all")]
    month: Option<String>,

    /// The directory to write the file into. Defaults to the current directory.
    #[arg(long, default_value = ".")]
    output: PathBuf,
}

impl ExportArgs {
    pub fn new(all: bool, month: Option<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            all,
            month,
            output: output.into(),
        }
    }

    pub fn all(&self) -> bool {
        self.all
    }

    pub fn month(&self) -> Option<MonthSelector> {
        self.month.as_deref().and_then(MonthSelector::new)
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

fn default_expense_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("expense-sync"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --expense-home or EXPENSE_HOME instead of relying on the \
                default directory.",
            );
            PathBuf::from("expense-sync")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
