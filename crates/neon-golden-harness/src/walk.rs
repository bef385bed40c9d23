//! Fixture discovery.

use std::path::{Path, PathBuf};

use crate::error::HarnessError;

/// Collect every file under `root` with the given extension, recursively.
///
/// Entries are visited in sorted order within each directory so batches are
/// reproducible across filesystems.
pub fn collect_fixtures(root: &Path, extension: &str) -> Result<Vec<PathBuf>, HarnessError> {
    let mut found = Vec::new();
    visit(root, extension, &mut found)?;
    Ok(found)
}

fn visit(dir: &Path, extension: &str, found: &mut Vec<PathBuf>) -> Result<(), HarnessError> {
    let mut entries = std::fs::read_dir(dir)
        .map_err(|e| HarnessError::io(dir, e))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| HarnessError::io(dir, e))?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            visit(&path, extension, found)?;
        } else if path.is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some(extension)
        {
            found.push(path);
        }
    }
    Ok(())
}
