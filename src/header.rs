//! Header row and dialect detection for W2 data files.
//!
//! W2 places the column header on line 0 for time-series output files named
//! with the reserved `tsr` prefix and on line 2 (after a title line and a
//! blank line) for everything else. The layout dialect comes from the file
//! extension, with `.npt`/`.opt` files switching to comma-delimited reading
//! when their first data line contains a comma.

use crate::constants::{
    DEFAULT_HEADER_ROW, DELIMITED_EXTENSIONS, FIXED_WIDTH_EXTENSIONS, TSR_HEADER_ROW, TSR_PREFIX,
};
use crate::error::{Result, W2Error};
use crate::models::FileDialect;
use std::path::Path;
use tracing::debug;

/// Zero-based header row implied by a file name
pub fn header_row_for(path: &Path) -> usize {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    if name.starts_with(TSR_PREFIX) {
        TSR_HEADER_ROW
    } else {
        DEFAULT_HEADER_ROW
    }
}

/// Decide how to split the data lines of a file.
///
/// `lines` is the file content; the first non-blank line after `header_row`
/// is sniffed for a comma when the extension alone is not decisive.
pub fn detect_dialect(path: &Path, lines: &[&str], header_row: usize) -> Result<FileDialect> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    if DELIMITED_EXTENSIONS.contains(&extension.as_str()) {
        return Ok(FileDialect::Delimited);
    }

    if FIXED_WIDTH_EXTENSIONS.contains(&extension.as_str()) {
        let first_data_line = lines
            .iter()
            .skip(header_row + 1)
            .find(|line| !line.trim().is_empty());
        let dialect = match first_data_line {
            Some(line) if line.contains(',') => FileDialect::Delimited,
            _ => FileDialect::FixedWidth,
        };
        debug!(
            "Detected {} layout for {} (.{} extension)",
            dialect,
            path.display(),
            extension
        );
        return Ok(dialect);
    }

    Err(W2Error::UnknownFileType {
        path: path.to_path_buf(),
    })
}
