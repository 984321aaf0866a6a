mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod model;
pub mod sync;
mod utils;

#[cfg(test)]
mod test;

pub use api::{Endpoint, ExpenseQuery, ExpenseService, HttpService, MemoryService, Mode, Request};
pub use config::Config;
pub use error::{Error, Result, SyncError, SyncResult};
pub use sync::SyncCoordinator;
