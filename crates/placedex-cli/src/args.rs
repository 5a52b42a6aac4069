use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for placedex-cli
#[derive(Debug, Parser)]
#[command(
    name = "placedex",
    version,
    about = "Harvest places from the catalog API and answer autocomplete queries"
)]
pub struct CliArgs {
    /// Path to a JSON settings file (default: built-in defaults + PLACEDEX_* env)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Store snapshot to restore on start and save after each cycle
    #[arg(short = 's', long = "snapshot", global = true)]
    pub snapshot: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the harvest scheduler and answer queries read from stdin
    Run {
        /// Start the first cycle immediately instead of after the initial delay
        #[arg(long)]
        no_initial_delay: bool,
    },

    /// Run exactly one harvest cycle and print its report
    Harvest,

    /// Autocomplete a query against the snapshot
    Query {
        /// Free text, e.g. "wash co"
        text: String,
    },

    /// Print the category index (id → name)
    Places,

    /// Print the ranking score of a name
    Score {
        name: String,

        /// Category baseline (1 = country … 5 = postal code)
        #[arg(short = 'b', long, default_value_t = 1)]
        baseline: u64,
    },
}
