//! Shared helpers for paths used by the CLI and the TUI.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const APP_DIR: &str = "pdfrag";

/// Gets the cross-platform data directory for pdfrag.
///
/// Returns `{data_dir}/pdfrag` where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn app_data_dir() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;

    Ok(data_dir.join(APP_DIR))
}

/// Default vector store location: `{data_dir}/pdfrag/vectorstore.db`.
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn default_store_path() -> Result<PathBuf> {
    Ok(app_data_dir()?.join("vectorstore.db"))
}

/// Log file used while the TUI owns the terminal.
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn default_log_path() -> Result<PathBuf> {
    Ok(app_data_dir()?.join("pdfrag.log"))
}

/// Ensures the parent directory of `path` exists.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub fn ensure_parent_directory(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Splits a comma-separated list of paths, trimming whitespace and skipping
/// empty entries.
///
/// An entry wrapped in single or double quotes is taken as one path, so
/// filenames containing commas can be given as `"a, b.pdf"`.
pub fn parse_paths(input: &str) -> Vec<PathBuf> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') if current.trim().is_empty() => {
                current.clear();
                quote = Some(c);
            }
            (None, ',') => entries.push(std::mem::take(&mut current)),
            (None, c) => current.push(c),
        }
    }
    entries.push(current);

    entries
        .iter()
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(PathBuf::from)
        .collect()
}
