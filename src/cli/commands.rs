//! Command implementations for the W2 processor CLI
//!
//! This module contains the command execution logic, progress reporting and
//! the final summary for the `convert` and `inspect` subcommands.

use crate::cli::args::{Args, Commands, ConvertArgs, InspectArgs, ReadArgs};
use crate::config::ExportOptions;
use crate::descriptor::FormatDescriptor;
use crate::export::{ExportFormat, exporter_for};
use crate::processor::SeriesReader;
use crate::processor::discovery::discover_data_files;
use crate::table::TimeSeriesTable;
use anyhow::{Context, Result, bail};
use colored::*;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Conversion statistics for reporting
#[derive(Debug, Clone, Default)]
pub struct ConversionStats {
    /// Data files found under the inputs
    pub files_discovered: usize,
    /// Files read and exported to every requested format
    pub files_converted: usize,
    /// Files that failed to read or to export
    pub files_failed: usize,
    /// Rows read across all files
    pub rows_read: usize,
    /// Malformed fields replaced with missing values
    pub field_warnings: usize,
    /// Total processing time
    pub processing_time: Duration,
    /// Output files and their sizes in bytes
    pub output_sizes: Vec<(String, u64)>,
}

impl ConversionStats {
    /// Calculate total output size in bytes
    pub fn total_output_size(&self) -> u64 {
        self.output_sizes.iter().map(|(_, size)| size).sum()
    }

    /// Format output size in human-readable format
    pub fn format_size(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", bytes, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

/// Main command runner
pub fn run(args: Args) -> Result<()> {
    setup_logging(&args);
    debug!("Command line arguments: {:?}", args);

    match &args.command {
        Some(Commands::Convert(convert)) => {
            let stats = run_convert(convert, args.show_progress())?;
            if stats.files_failed > 0 {
                bail!(
                    "{} of {} files could not be converted",
                    stats.files_failed,
                    stats.files_discovered
                );
            }
            Ok(())
        }
        Some(Commands::Inspect(inspect)) => run_inspect(inspect),
        None => Ok(()),
    }
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("w2_processor={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
}

fn load_descriptor(read: &ReadArgs) -> Result<Option<Arc<FormatDescriptor>>> {
    read.descriptor
        .as_deref()
        .map(|path| {
            FormatDescriptor::from_path(path)
                .map(Arc::new)
                .with_context(|| format!("Failed to load descriptor {}", path.display()))
        })
        .transpose()
}

/// Where a series is written for a format.
///
/// SQLite and HDF5 outputs are shared containers holding every series; the
/// other formats get one file per series.
pub fn destination_for(
    format: ExportFormat,
    output_dir: &Path,
    container: &str,
    series: &str,
) -> PathBuf {
    let stem = match format {
        ExportFormat::Relational | ExportFormat::Hierarchical => container,
        _ => series,
    };
    output_dir.join(format!("{}.{}", stem, format.extension()))
}

/// Read every discovered file and export it to each requested format
pub fn run_convert(args: &ConvertArgs, show_progress: bool) -> Result<ConversionStats> {
    let start_time = Instant::now();
    args.validate()?;

    let formats = args.export_formats()?;
    let options = args.export_options()?;
    let reader = SeriesReader::new(load_descriptor(&args.read)?, args.read.read_config())?;

    let mut files = discover_data_files(&args.inputs, args.recursive)?;
    if let Some(descriptor) = &args.read.descriptor {
        files.retain(|file| !same_file(file, descriptor));
    }
    if files.is_empty() {
        bail!("No .npt, .opt or .csv files found in the given inputs");
    }
    fs::create_dir_all(&args.output_dir).with_context(|| {
        format!("Failed to create output directory {}", args.output_dir.display())
    })?;
    info!(
        "Converting {} files to {} in {}",
        files.len(),
        formats.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
        args.output_dir.display()
    );

    let progress_bar = if show_progress {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut stats = ConversionStats {
        files_discovered: files.len(),
        ..Default::default()
    };
    let mut outputs = BTreeSet::new();

    for file in &files {
        if let Some(pb) = &progress_bar {
            pb.set_message(format!("{}", file.display()));
        }

        match reader.read(file) {
            Ok(result) => {
                stats.rows_read += result.table.row_count();
                stats.field_warnings += result.stats.warning_count();
                let written = export_table(&result.table, file, &formats, args, &options);
                let all_written = written.len() == formats.len();
                outputs.extend(written);
                if all_written {
                    stats.files_converted += 1;
                } else {
                    stats.files_failed += 1;
                }
            }
            Err(e) => {
                error!("Failed to read {}: {}", file.display(), e);
                stats.files_failed += 1;
            }
        }

        if let Some(pb) = &progress_bar {
            pb.inc(1);
        }
    }

    if let Some(pb) = &progress_bar {
        pb.finish_with_message("Conversion complete");
    }

    stats.output_sizes = outputs
        .into_iter()
        .filter_map(|path: PathBuf| {
            let size = fs::metadata(&path).ok()?.len();
            Some((path.display().to_string(), size))
        })
        .collect();
    stats.processing_time = start_time.elapsed();

    generate_report(&stats);
    Ok(stats)
}

/// Export one table; returns the destinations written successfully
fn export_table(
    table: &TimeSeriesTable,
    source: &Path,
    formats: &[ExportFormat],
    args: &ConvertArgs,
    options: &ExportOptions,
) -> Vec<PathBuf> {
    let mut written = Vec::new();
    for format in formats {
        let destination = destination_for(*format, &args.output_dir, &args.container, table.name());
        if same_file(source, &destination) {
            error!(
                "Refusing to write {} over its own source file",
                destination.display()
            );
            continue;
        }
        match exporter_for(*format).export(table, &destination, options) {
            Ok(()) => written.push(destination),
            Err(e) => error!("{} export of {} failed: {}", format, source.display(), e),
        }
    }
    written
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Print the conversion summary
fn generate_report(stats: &ConversionStats) {
    let duration = HumanDuration(stats.processing_time);
    let total_size = ConversionStats::format_size(stats.total_output_size());

    println!();
    println!("{}", "W2 Conversion Complete".bright_green().bold());
    println!("  Files discovered: {}", stats.files_discovered);
    println!("  Files converted:  {}", stats.files_converted.to_string().bright_green());
    if stats.files_failed > 0 {
        println!("  Files failed:     {}", stats.files_failed.to_string().bright_red());
    }
    println!("  Rows read:        {}", stats.rows_read);
    if stats.field_warnings > 0 {
        println!(
            "  Field warnings:   {}",
            stats.field_warnings.to_string().bright_yellow()
        );
    }
    println!("  Output size:      {}", total_size);
    println!("  Processing time:  {}", duration);

    if !stats.output_sizes.is_empty() {
        println!("\n{}", "Output files:".bright_cyan());
        for (filename, size) in &stats.output_sizes {
            println!("  {}: {}", filename, ConversionStats::format_size(*size));
        }
    }
    println!();
}

/// Print a descriptor's sections and/or a summary of each data file
pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    args.validate()?;
    let descriptor = load_descriptor(&args.read)?;

    if let Some(descriptor) = &descriptor {
        print_descriptor(descriptor);
    }

    let reader = SeriesReader::new(descriptor, args.read.read_config())?;
    for file in &args.files {
        let result = reader
            .read(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        print_table_summary(&result.table);
        println!(
            "  Fields parsed cleanly: {:.1}%",
            result
                .stats
                .field_success_rate(result.table.columns().len())
        );

        let warnings = &result.stats.field_errors;
        if !warnings.is_empty() {
            println!(
                "  {} {}",
                warnings.len().to_string().bright_yellow(),
                "malformed fields read as missing:".bright_yellow()
            );
            for warning in warnings.iter().take(5) {
                println!("    {}", warning);
            }
            if warnings.len() > 5 {
                println!("    ...");
            }
        }
        println!();
    }
    Ok(())
}

fn print_descriptor(descriptor: &FormatDescriptor) {
    let source = descriptor
        .source()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    println!(
        "{} {} ({} fields)",
        "Descriptor".bright_green().bold(),
        source,
        descriptor.field_count()
    );
    for section in descriptor.sections() {
        println!(
            "\n  {} {}",
            section.name.bright_cyan().bold(),
            format!("(line {})", section.line_number).bright_black()
        );
        for field in &section.fields {
            println!(
                "    {:<32} {:<10} {:>10} x{:<8} [{}, {}] {} #{}",
                field.name,
                field.unit.as_deref().unwrap_or("-"),
                field.format_code.to_string(),
                field.multiplier,
                field.min,
                field.max,
                if field.plot_flag { "ON " } else { "OFF" },
                field.sequence_index
            );
        }
    }
    println!();
}

fn print_table_summary(table: &TimeSeriesTable) {
    println!(
        "{} {} ({} rows, reference year {})",
        "Table".bright_green().bold(),
        table.name().bright_cyan(),
        table.row_count(),
        table.reference_year()
    );
    if let (Some(first), Some(last)) = (table.index().first(), table.index().last()) {
        println!("  {} to {}", first, last);
    }
    for column in table.columns() {
        let meta = column.metadata();
        let out_of_range = column.out_of_range().len();
        let mut line = format!(
            "    {:<32} {:<10} missing {}",
            column.name(),
            meta.unit.as_deref().unwrap_or("-"),
            column.missing_count()
        );
        if out_of_range > 0 {
            line.push_str(&format!(", {} outside plot range", out_of_range));
        }
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::Args;
    use clap::Parser;
    use tempfile::TempDir;

    fn convert_args(argv: &[&str]) -> ConvertArgs {
        match Args::try_parse_from(argv).unwrap().command {
            Some(Commands::Convert(convert)) => convert,
            other => panic!("expected convert, got {other:?}"),
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(ConversionStats::format_size(0), "0 B");
        assert_eq!(ConversionStats::format_size(512), "512 B");
        assert_eq!(ConversionStats::format_size(1536), "1.50 KB");
        assert_eq!(ConversionStats::format_size(1024 * 1024), "1.00 MB");
    }

    #[test]
    fn test_destination_for() {
        let out = Path::new("out");
        assert_eq!(
            destination_for(ExportFormat::Relational, out, "w2_series", "qwo_1"),
            out.join("w2_series.db")
        );
        assert_eq!(
            destination_for(ExportFormat::Hierarchical, out, "w2_series", "qwo_1"),
            out.join("w2_series.h5")
        );
        assert_eq!(
            destination_for(ExportFormat::NetCdf, out, "w2_series", "qwo_1"),
            out.join("qwo_1.nc")
        );
    }

    #[test]
    fn test_convert_directory() {
        let dir = TempDir::new().unwrap();
        let run = dir.path().join("run");
        fs::create_dir_all(&run).unwrap();
        fs::write(
            run.join("tsr_1_seg5.csv"),
            "JDAY,T2(C),Q(m3/s)\n1.0,7.5,3.0\n1.5,7.7,\n",
        )
        .unwrap();
        fs::write(run.join("tsr_2_seg9.csv"), "JDAY,T2(C)\n1.0,8.5\n").unwrap();
        fs::write(run.join("notes.txt"), "not data").unwrap();
        let descriptor = run.join("graph.npt");
        fs::write(
            &descriptor,
            format!(
                "{:<30}{:<10}{:<8}{:<8}{:<8}{:<6}{}\n{:<30}{:<10}{:<8}{:<8}{:<8}{:<6}{}\n",
                "........CONSTITUENT NAME", "FORMAT", "MULT", "MIN", "MAX", "PLOT", "SEQ",
                "Temperature, C", "(f8.2)", "1.0", "0.0", "30.0", "ON", "1",
            ),
        )
        .unwrap();
        let out = dir.path().join("out");

        let args = convert_args(&[
            "w2_processor",
            "convert",
            run.to_str().unwrap(),
            "--descriptor",
            descriptor.to_str().unwrap(),
            "--year",
            "2012",
            "-f",
            "sqlite,parquet",
            "-o",
            out.to_str().unwrap(),
        ]);
        let stats = run_convert(&args, false).unwrap();

        // The descriptor is not mistaken for a data file.
        assert_eq!(stats.files_discovered, 2);
        assert_eq!(stats.files_converted, 2);
        assert_eq!(stats.files_failed, 0);
        assert_eq!(stats.rows_read, 3);
        assert!(out.join("w2_series.db").exists());
        assert!(out.join("tsr_1_seg5.parquet").exists());
        assert_eq!(stats.output_sizes.len(), 3);

        // A second run without --overwrite refuses every output.
        let again = run_convert(&args, false).unwrap();
        assert_eq!(again.files_failed, 2);
    }

    #[test]
    fn test_inspect_data_file() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("tsr_3_seg7.csv");
        fs::write(&data, "JDAY,T2(C),Q\n1.0,7.5,bad\n1.5,7.7,2.0\n").unwrap();
        let argv = ["w2_processor", "inspect", data.to_str().unwrap(), "--year", "2010"];
        match Args::try_parse_from(argv).unwrap().command {
            Some(Commands::Inspect(inspect)) => run_inspect(&inspect).unwrap(),
            other => panic!("expected inspect, got {other:?}"),
        }

        let missing = ["w2_processor", "inspect", "/no/such/tsr_1.csv", "--year", "2010"];
        match Args::try_parse_from(missing).unwrap().command {
            Some(Commands::Inspect(inspect)) => assert!(run_inspect(&inspect).is_err()),
            other => panic!("expected inspect, got {other:?}"),
        }
    }

    #[test]
    fn test_convert_without_data_files_fails() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().to_str().unwrap();
        let args = convert_args(&["w2_processor", "convert", input, "--year", "2000"]);
        assert!(run_convert(&args, false).is_err());
    }
}
