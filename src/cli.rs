use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::io::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "dcrcheck")]
#[command(about = "DCR process graph execution and analysis engine", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze graphs: cycles, acceptance, deadlock/livelock freedom
    Analyze {
        /// Graph files in the textual DCR format
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report only the first cycle per family
        #[arg(long)]
        first_cycle_only: bool,
    },

    /// Fire a sequence of activities against a graph
    Execute {
        /// Graph file in the textual DCR format
        file: PathBuf,

        /// Comma-separated activity ids to fire in order
        #[arg(long, value_delimiter = ',')]
        run: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Merge graphs and check preservation and freedom
    Merge {
        /// Graph files in the textual DCR format
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// JSON trace file to replay against the merge views
        #[arg(long)]
        traces: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replay stored traces against a graph
    Trace {
        /// Graph file in the textual DCR format
        file: PathBuf,

        /// JSON trace file
        #[arg(long)]
        traces: PathBuf,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a graph and print its canonical textual export
    Export {
        /// Graph file in the textual DCR format
        file: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
