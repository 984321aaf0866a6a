use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory and an initial `config.json` that points at `base_url`.
///
/// # Errors
/// - Returns an error if `base_url` is invalid or if any file operations fail.
pub async fn init(expense_home: &Path, base_url: &str) -> Result<Out<()>> {
    let config = Config::create(expense_home, base_url)
        .await
        .context("Unable to create the data directory and config")?;
    Ok(format!(
        "Successfully created the config at {}",
        config.config_path().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn init_writes_a_loadable_config() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        let out = init(&home, "http://localhost:5000").await.unwrap();
        assert!(out.message().starts_with("Successfully created"));
        assert!(Config::load(&home).await.is_ok());
    }
}
