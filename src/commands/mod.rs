//! Command handlers for the expense CLI.
//!
//! Each handler drives one sync session against the configured service and returns an `Out`.

mod category;
mod dashboard;
mod expense;
mod init;
mod session;
mod transfer;

use crate::api::{self, Mode};
use crate::sync::{Refresh, SyncCoordinator};
use crate::{Config, Result};
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info, warn};

pub use category::{add_category, delete_category, list_categories};
pub use dashboard::dashboard;
pub use expense::{add, clear, delete, duplicate, edit, salary};
pub use init::init;
pub use session::session;
pub use transfer::{export, import};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Builds a session against the service selected by `mode`.
fn coordinator(config: &Config, mode: Mode) -> Result<SyncCoordinator> {
    let service = api::service(config, mode)?;
    Ok(SyncCoordinator::new(service, config.settings()))
}

/// Logs the parts of a refresh that failed. The write that triggered it already succeeded.
fn report(refresh: &Refresh) {
    for (part, e) in refresh.failures() {
        warn!("The change was saved but {part} could not be reloaded: {e}");
    }
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
