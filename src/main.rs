use clap::Parser;
use std::process;
use w2_processor::cli::{args::Args, commands};

fn main() {
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    match commands::run(args) {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("W2 Processor - CE-QUAL-W2 time-series converter");
    println!("===============================================");
    println!();
    println!("Read CE-QUAL-W2 fixed-width and CSV time-series files into calendar-indexed");
    println!("tables and export them to SQLite, HDF5, NetCDF, Parquet or W2 CSV.");
    println!();
    println!("USAGE:");
    println!("    w2_processor <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    convert     Read data files and export them");
    println!("    inspect     Print descriptor sections or data file summaries");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("EXAMPLES:");
    println!("    # Convert every output file of a run to SQLite and NetCDF:");
    println!("    w2_processor convert run/ --descriptor run/graph.npt -f sqlite,netcdf -o out/");
    println!();
    println!("    # Convert with an explicit reference year:");
    println!("    w2_processor convert run/tsr_1_seg42.csv --year 2008 -f hdf5");
    println!();
    println!("    # Show how a descriptor lays out its columns:");
    println!("    w2_processor inspect --descriptor run/graph.npt");
    println!();
    println!("For detailed help on any command, use:");
    println!("    w2_processor <COMMAND> --help");
}
