//! Data file discovery for W2 model directories
//!
//! Expands command-line inputs into the list of data files to read:
//! files are taken as given, directories are walked for `.npt`, `.opt`
//! and `.csv` files, skipping the control file itself.

use crate::constants::{
    CONTROL_FILE_CSV, CONTROL_FILE_NPT, DELIMITED_EXTENSIONS, FIXED_WIDTH_EXTENSIONS,
};
use crate::error::{Result, W2Error};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// True for files with a W2 data extension that are not control files
pub fn is_data_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if name == CONTROL_FILE_CSV || name == CONTROL_FILE_NPT {
        return false;
    }
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| {
            FIXED_WIDTH_EXTENSIONS.contains(&ext.as_str())
                || DELIMITED_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Expand files and directories into a sorted, de-duplicated file list
pub fn discover_data_files(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
            continue;
        }
        if !input.is_dir() {
            return Err(W2Error::FileNotFound { path: input.clone() });
        }

        let walker = WalkDir::new(input).max_depth(if recursive { usize::MAX } else { 1 });
        for entry in walker {
            let entry = entry.map_err(|e| W2Error::Io(e.into()))?;
            if entry.file_type().is_file() && is_data_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }

    files.sort();
    files.dedup();
    debug!("Discovered {} data files", files.len());
    Ok(files)
}
