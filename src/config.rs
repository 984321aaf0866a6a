//! Configuration file handling for expense-sync.
//!
//! The configuration file is stored at `$EXPENSE_HOME/config.json` and holds the URL of the
//! expense service along with the tunables of a sync session and the presentation of amounts.

use crate::model::{AmountStyle, Grouping, DEFAULT_GLYPH};
use crate::sync::{SyncSettings, DEFAULT_PAGE_LIMIT};
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const APP_NAME: &str = "expense-sync";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_HEARTBEAT_MS: u64 = 2000;

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$EXPENSE_HOME` and from there it loads `$EXPENSE_HOME/config.json`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    base_url: Url,
}

impl Config {
    /// Creates the data directory and an initial `config.json` pointing at `base_url`, with
    /// default settings for everything else.
    ///
    /// # Errors
    /// - Returns an error if `base_url` is not a valid http(s) URL or if any file operation fails.
    pub async fn create(dir: impl Into<PathBuf>, base_url: &str) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the expense home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;
        let config_path = root.join(CONFIG_JSON);

        let config_file = ConfigFile {
            base_url: base_url.to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            config_path,
            config_file,
            base_url,
        })
    }

    /// Validates that `expense_home` and its config file exist, then loads and validates the
    /// config file.
    pub async fn load(expense_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = expense_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Expense home is missing")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let base_url = parse_base_url(&config_file.base_url)?;

        Ok(Self {
            root,
            config_path,
            config_file,
            base_url,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn settings(&self) -> SyncSettings {
        SyncSettings {
            page_limit: self.config_file.page_limit,
            debounce: Duration::from_millis(self.config_file.debounce_ms),
            heartbeat: Duration::from_millis(self.config_file.heartbeat_ms),
        }
    }

    pub fn amount_style(&self) -> AmountStyle {
        AmountStyle::new(
            self.config_file.currency_glyph.clone(),
            self.config_file.grouping,
        )
    }
}

fn parse_base_url(s: &str) -> Result<Url> {
    let url = Url::parse(s).with_context(|| format!("Invalid service URL '{s}'"))?;
    anyhow::ensure!(
        matches!(url.scheme(), "http" | "https"),
        "The service URL must be http or https, got '{}'",
        url.scheme()
    );
    Ok(url)
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "expense-sync",
///   "config_version": 1,
///   "base_url": "http://127.0.0.1:5000",
///   "page_limit": 50,
///   "debounce_ms": 500,
///   "heartbeat_ms": 2000,
///   "currency_glyph": "₹",
///   "grouping": "indian"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "expense-sync"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Root URL of the expense service
    base_url: String,

    /// Records requested per page
    #[serde(default = "default_page_limit")]
    page_limit: u32,

    /// Quiet period before a search is sent
    #[serde(default = "default_debounce_ms")]
    debounce_ms: u64,

    /// Keep-alive interval
    #[serde(default = "default_heartbeat_ms")]
    heartbeat_ms: u64,

    #[serde(default = "default_glyph")]
    currency_glyph: String,

    #[serde(default)]
    grouping: Grouping,
}

fn default_page_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_heartbeat_ms() -> u64 {
    DEFAULT_HEARTBEAT_MS
}

fn default_glyph() -> String {
    DEFAULT_GLYPH.to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            base_url: String::new(),
            page_limit: DEFAULT_PAGE_LIMIT,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            heartbeat_ms: DEFAULT_HEARTBEAT_MS,
            currency_glyph: default_glyph(),
            grouping: Grouping::default(),
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if it fails validation.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path)
            .await
            .context("Unable to load the config file")?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(config.page_limit > 0, "page_limit must be at least 1");
        anyhow::ensure!(config.heartbeat_ms > 0, "heartbeat_ms must be at least 1");

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_create_and_load() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("expense_home");

        let created = Config::create(&home_dir, "http://127.0.0.1:5000")
            .await
            .unwrap();
        assert!(created.config_path().is_file());
        assert_eq!(created.base_url().as_str(), "http://127.0.0.1:5000/");

        let loaded = Config::load(&home_dir).await.unwrap();
        assert_eq!(loaded.base_url(), created.base_url());
        assert_eq!(loaded.settings(), SyncSettings::default());
        assert_eq!(loaded.amount_style(), AmountStyle::default());
    }

    #[tokio::test]
    async fn test_config_create_rejects_bad_url() {
        let dir = TempDir::new().unwrap();
        assert!(Config::create(dir.path(), "not a url").await.is_err());
        assert!(Config::create(dir.path(), "ftp://example.com").await.is_err());
    }

    #[tokio::test]
    async fn test_config_load_missing() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load(dir.path().join("nope")).await.is_err());
        assert!(Config::load(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let dir = TempDir::new().unwrap();
        let json = r#"{
            "app_name": "expense-sync",
            "config_version": 1,
            "base_url": "https://expenses.example.com/api",
            "grouping": "western"
        }"#;
        utils::write(dir.path().join(CONFIG_JSON), json)
            .await
            .unwrap();

        let config = Config::load(dir.path()).await.unwrap();
        assert_eq!(config.settings().page_limit, 50);
        assert_eq!(config.settings().debounce, Duration::from_millis(500));
        assert_eq!(config.amount_style().grouping(), Grouping::Western);
        assert_eq!(config.amount_style().glyph(), "₹");
    }

    #[tokio::test]
    async fn test_config_file_wrong_app_name() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join(CONFIG_JSON);
        let json = r#"{"app_name": "budget-tool", "config_version": 1, "base_url": "http://x"}"#;
        utils::write(&config_path, json).await.unwrap();
        let err = ConfigFile::load(&config_path).await.unwrap_err();
        assert!(format!("{err:#}").contains("Invalid app_name"));
    }

    #[tokio::test]
    async fn test_config_file_zero_heartbeat() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join(CONFIG_JSON);
        let json = r#"{"app_name": "expense-sync", "config_version": 1, "base_url": "http://x", "heartbeat_ms": 0}"#;
        utils::write(&config_path, json).await.unwrap();
        let err = ConfigFile::load(&config_path).await.unwrap_err();
        assert!(format!("{err:#}").contains("heartbeat_ms"));
    }

    #[tokio::test]
    async fn test_config_file_save_and_load() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join(CONFIG_JSON);
        let original = ConfigFile {
            base_url: "http://localhost:8000".to_string(),
            page_limit: 10,
            currency_glyph: "$".to_string(),
            grouping: Grouping::Western,
            ..ConfigFile::default()
        };
        original.save(&config_path).await.unwrap();
        let loaded = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(original, loaded);
    }
}
