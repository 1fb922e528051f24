//! Unit tests for the parser module
//!
//! Shared fixtures write small W2 files into a temporary directory so the
//! file name conventions apply.

pub mod fixed_width_tests;
pub mod numeric_tests;

use crate::descriptor::FormatDescriptor;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Write `content` to `name` inside a fresh temporary directory
pub fn write_file(name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    (dir, path)
}

/// One descriptor row laid out on the standard zone columns
pub fn descriptor_row(
    name: &str,
    fmt: &str,
    mult: &str,
    min: &str,
    max: &str,
    plot: &str,
    seq: &str,
) -> String {
    format!("{name:<30}{fmt:<10}{mult:<8}{min:<8}{max:<8}{plot:<6}{seq}")
}

/// Two-section descriptor: elevation and flow, then temperature
pub fn sample_descriptor() -> FormatDescriptor {
    let text = [
        descriptor_row("........HYDRODYNAMIC NAME", "FORMAT", "MULT", "MIN", "MAX", "PLOT", "SEQ"),
        descriptor_row("Water level, m", "(f8.2)", "1.0", "-1.0", "-1.0", "ON", "1"),
        descriptor_row("Flow rate, m3/s", "(f10.3)", "1.0", "0.0", "500.0", "OFF", "2"),
        String::new(),
        descriptor_row("........CONSTITUENT NAME", "FORMAT", "MULT", "MIN", "MAX", "PLOT", "SEQ"),
        descriptor_row("Temperature [T1], C", "(f8.2)", "1.0", "-2.0", "30.0", "ON", "4"),
    ]
    .join("\n");
    FormatDescriptor::parse_str(&text).unwrap()
}
