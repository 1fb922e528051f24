//! Reference-year discovery from the W2 control file.
//!
//! Model runs keep `w2_con.csv` or `w2_con.npt` next to their input and
//! output files. The start year sits on the line after the `TMSTRT` row in
//! the CSV form, and after the `TMSTR`/`TIME` card in the fixed-width form.

use crate::constants::{
    CONTROL_CSV_TIME_LABEL, CONTROL_CSV_YEAR_CELL, CONTROL_FILE_CSV, CONTROL_FILE_NPT,
    CONTROL_NPT_TIME_LABELS, CONTROL_NPT_YEAR_OFFSET,
};
use crate::error::Result;
use crate::parser::numeric::parse_number;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Candidate control files for a data file, in search order
pub fn control_file_candidates(data_file: &Path) -> Vec<PathBuf> {
    let dir = data_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let parent = dir.join("..");
    vec![
        dir.join(CONTROL_FILE_CSV),
        parent.join(CONTROL_FILE_CSV),
        dir.join(CONTROL_FILE_NPT),
        parent.join(CONTROL_FILE_NPT),
    ]
}

/// Find the simulation start year for a data file, if a control file exists
pub fn find_reference_year(data_file: &Path) -> Result<Option<i32>> {
    for candidate in control_file_candidates(data_file) {
        if !candidate.is_file() {
            continue;
        }
        let bytes = fs::read(&candidate)?;
        let content = String::from_utf8_lossy(&bytes);
        let is_csv = candidate
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        let year = if is_csv {
            year_from_csv(&content)
        } else {
            year_from_npt(&content)
        };
        match year {
            Some(year) => {
                info!("Reference year {} from {}", year, candidate.display());
                return Ok(Some(year));
            }
            None => debug!("No start year found in {}", candidate.display()),
        }
    }
    Ok(None)
}

/// Start year from the CSV control file
pub fn year_from_csv(content: &str) -> Option<i32> {
    let mut lines = content.lines();
    while let Some(line) = lines.next() {
        let first = line.split(',').next().unwrap_or_default().trim();
        if first.eq_ignore_ascii_case(CONTROL_CSV_TIME_LABEL) {
            let cell = lines.next()?.split(',').nth(CONTROL_CSV_YEAR_CELL)?;
            return parse_year(cell);
        }
    }
    None
}

/// Start year from the fixed-width control file
pub fn year_from_npt(content: &str) -> Option<i32> {
    let mut lines = content.lines();
    while let Some(line) = lines.next() {
        let upper = line.trim_start().to_ascii_uppercase();
        if CONTROL_NPT_TIME_LABELS.iter().any(|label| upper.starts_with(label)) {
            let next: Vec<char> = lines.next()?.chars().collect();
            let cell: String = next.iter().skip(CONTROL_NPT_YEAR_OFFSET).collect();
            return parse_year(cell.trim());
        }
    }
    None
}

fn parse_year(text: &str) -> Option<i32> {
    let value = parse_number(text)?;
    (value.fract() == 0.0 && value.abs() < 1e6).then_some(value as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_year_from_csv() {
        let content = "W2 control\nTMSTRT,TMSTRT,YEAR\n,60.0,2006\n";
        assert_eq!(year_from_csv(content), Some(2006));
        assert_eq!(year_from_csv("TMSTRT,TMSTRT,YEAR\n,60.0\n"), None);
    }

    #[test]
    fn test_year_from_npt() {
        let content = format!(
            "TIME CON  TMSTRT   TMEND    YEAR\n{:8}{:>8}{:>8}{:>8}\n",
            "", "60.0", "365.0", "2012"
        );
        assert_eq!(year_from_npt(&content), Some(2012));
        assert_eq!(year_from_npt("nothing here\n"), None);
    }

    #[test]
    fn test_find_reference_year_in_parent() {
        let dir = TempDir::new().unwrap();
        let run = dir.path().join("run1");
        fs::create_dir_all(&run).unwrap();
        fs::write(dir.path().join("w2_con.csv"), "TMSTRT,TMSTRT,YEAR\n,1.0,1999\n").unwrap();

        let data = run.join("tsr_1_seg2.csv");
        assert_eq!(find_reference_year(&data).unwrap(), Some(1999));
    }

    #[test]
    fn test_find_reference_year_absent() {
        let dir = TempDir::new().unwrap();
        let isolated = dir.path().join("a").join("b");
        fs::create_dir_all(&isolated).unwrap();
        assert_eq!(find_reference_year(&isolated.join("x.npt")).unwrap(), None);
    }
}
