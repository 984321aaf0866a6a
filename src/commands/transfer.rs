use crate::api::Mode;
use crate::args::ExportArgs;
use crate::commands::{coordinator, report, Out};
use crate::model::ImportFile;
use crate::sync::{ExportScope, SessionView};
use crate::{utils, Config, Result};
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Uploads `path` to the service's bulk import.
pub async fn import(config: Config, mode: Mode, path: &Path) -> Result<Out<SessionView>> {
    let bytes = utils::read_bytes(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "import".to_string());
    let sync = coordinator(&config, mode)?;
    let (message, refresh) = sync.import(&ImportFile { file_name, bytes }).await?;
    report(&refresh);
    Ok(Out::new(message, sync.view().await))
}

/// Downloads the selected month (or everything) into the output directory.
pub async fn export(config: Config, mode: Mode, args: &ExportArgs) -> Result<Out<PathBuf>> {
    let sync = coordinator(&config, mode)?;
    let scope = if args.all() {
        ExportScope::All
    } else {
        // The service resolves the month, so the export names the month the dashboard shows.
        sync.select_month(args.month()).await;
        ExportScope::Current
    };
    let download = sync.export(scope).await?;
    utils::make_dir(args.output()).await?;
    let destination = args.output().join(sanitize(&download.file_name));
    utils::write(&destination, &download.bytes)
        .await
        .context("Unable to save the export")?;
    Ok(Out::new(
        format!(
            "Exported {} bytes to {}",
            download.bytes.len(),
            destination.display()
        ),
        destination,
    ))
}

/// Keeps only the last path component of a service-provided file name.
fn sanitize(file_name: &str) -> String {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == ".." {
        "export".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize("../../etc/passwd"), "passwd");
        assert_eq!(sanitize("Expenses_Dec 2025.xlsx"), "Expenses_Dec 2025.xlsx");
        assert_eq!(sanitize("dir/"), "export");
    }
}
