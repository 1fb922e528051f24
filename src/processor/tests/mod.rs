//! Tests for the read pipeline
//!
//! Exercises descriptor-driven and header-driven reads end to end using
//! small W2 files written into temporary run directories.


use std::fs;
use std::path::{Path, PathBuf};

/// Descriptor text for a branch outflow file: flow, then temperature
pub fn outflow_descriptor() -> String {
    let row = |name: &str, fmt: &str, mult: &str, min: &str, max: &str, plot: &str, seq: &str| {
        format!("{name:<30}{fmt:<10}{mult:<8}{min:<8}{max:<8}{plot:<6}{seq}")
    };
    [
        "Branch outflow descriptor".to_string(),
        String::new(),
        row("........HYDRODYNAMIC NAME", "FORMAT", "MULT", "MIN", "MAX", "PLOT", "SEQ"),
        row("Outflow, m3/s", "(f8.2)", "1.0", "0.0", "50.0", "ON", "1"),
        String::new(),
        row("........CONSTITUENT NAME", "FORMAT", "MULT", "MIN", "MAX", "PLOT", "SEQ"),
        row("Temperature [T1], C", "(f8.2)", "1.0", "-2.0", "30.0", "ON", "2"),
        row("Dissolved oxygen [DO], g/m3", "(f8.2)", "0.001", "0.0", "15.0", "OFF", "2"),
    ]
    .join("\n")
}

/// Fixed-width outflow file matching [`outflow_descriptor`]
pub fn outflow_data() -> String {
    let line = |day: &str, q: &str, t: &str, o: &str| format!("{day:>8}{q:>8}{t:>8}{o:>8}");
    [
        "$ Outflow for branch 1".to_string(),
        String::new(),
        "    JDAY      QO      TO     DOO".to_string(),
        line("60.0", "12.50", "4.20", "11000."),
        line("60.5", "12.75", "4.35", "10800."),
        line("61.0", "13.00", "abc", "10500."),
        line("61.5", "13.25", "4.80", ""),
    ]
    .join("\n")
}

pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}
