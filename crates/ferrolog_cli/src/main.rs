//! ferrolog CLI
//!
//! Command-line tools for inspecting journal directories.
//!
//! # Commands
//!
//! - `inspect` - Display the segments of a journal directory
//! - `dump` - Dump framed records for debugging
//!
//! Both commands read segment files directly; they never write.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ferrolog command-line journal tools.
#[derive(Parser)]
#[command(name = "ferrolog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the journal directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// File-name prefix of the journal's segments
    #[arg(global = true, long, default_value = "journal")]
    prefix: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the segments of a journal directory
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Dump framed records for debugging
    Dump {
        /// Maximum number of records to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Journal path required for inspect")?;
            commands::inspect::run(&path, &cli.prefix, &format)?;
        }
        Commands::Dump { limit, format } => {
            let path = cli.path.ok_or("Journal path required for dump")?;
            commands::dump::run(&path, &cli.prefix, limit, &format)?;
        }
        Commands::Version => {
            println!("ferrolog CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
