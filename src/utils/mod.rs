//! Small filesystem helpers.

use anyhow::{Context, Result};
use std::path::Path;

/// Create a directory and its parents if they do not exist
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    Ok(())
}
