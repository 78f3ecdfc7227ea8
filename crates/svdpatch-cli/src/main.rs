mod interrupts;
mod makedeps;
mod mmap;
mod patch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "CMSIS-SVD patch engine", long_about = None)]
struct Cli {
    /// Enable debug-level tracing
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply a patch document to its SVD and write `<svd>.patched`.
    Patch {
        /// Path to the root patch document (YAML)
        yaml: PathBuf,
    },

    /// Resolve a patch document's includes and write a dependency line.
    Makedeps {
        /// Path to the root patch document (YAML)
        yaml: PathBuf,
        /// Path to write the Makefile-style dependency line to
        deps: PathBuf,
    },

    /// List an SVD's interrupts, sorted by value.
    Interrupts {
        /// Path to the SVD file
        svd: PathBuf,
        /// List unused interrupt values after the table (default)
        #[arg(long)]
        gaps: bool,
        /// Suppress the trailing gap listing
        #[arg(long, conflicts_with = "gaps")]
        no_gaps: bool,
    },

    /// Print an SVD's peripherals, registers, fields, and interrupts.
    Mmap {
        /// Path to the SVD file
        svd: PathBuf,
    },

    /// Print the crate version.
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let result = match cli.command {
        Commands::Patch { yaml } => patch::run(&yaml).map(|out| {
            println!("wrote {}", out.display());
        }),
        Commands::Makedeps { yaml, deps } => makedeps::run(&yaml, &deps),
        Commands::Interrupts { svd, no_gaps, .. } => {
            interrupts::run(&svd, !no_gaps).map(|out| println!("{out}"))
        }
        Commands::Mmap { svd } => mmap::run(&svd).map(|out| println!("{out}")),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
