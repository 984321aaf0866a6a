//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::api::MemoryService;
use crate::sync::{SyncCoordinator, SyncSettings};
use crate::Config;
use chrono::NaiveDate;
use std::sync::Arc;
use tempfile::TempDir;

/// Test environment with an expense home directory, a Config pointing at a local URL and an
/// in-memory service whose clock reads 20 Dec 2025.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
    service: Arc<MemoryService>,
    settings: SyncSettings,
}

impl TestEnv {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("expense-sync");
        let config = Config::create(&root, "http://127.0.0.1:5000")
            .await
            .unwrap();
        let service = Arc::new(MemoryService::new(
            NaiveDate::from_ymd_opt(2025, 12, 20).unwrap(),
        ));
        let settings = config.settings();
        Self {
            _temp_dir: temp_dir,
            config,
            service,
            settings,
        }
    }

    /// Like `new`, with a smaller page size so that tests can paginate a few records.
    pub async fn with_page_limit(page_limit: u32) -> Self {
        let mut env = Self::new().await;
        env.settings.page_limit = page_limit;
        env
    }

    pub fn config(&self) -> Config {
        self.config.clone()
    }

    pub fn service(&self) -> &MemoryService {
        &self.service
    }

    /// A new session over this environment's service.
    pub fn coordinator(&self) -> SyncCoordinator {
        SyncCoordinator::new(self.service.clone(), self.settings)
    }

    /// A day in December 2025, the month the service considers current.
    pub fn day(&self, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, day).unwrap()
    }
}
