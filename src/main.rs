use anyhow::Result;
use clap::Parser;
use dcrcheck::cli::{Cli, Commands};
use dcrcheck::commands::{analyze, execute, export, merge, trace};

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            files,
            format,
            output,
            first_cycle_only,
        } => analyze::run(analyze::AnalyzeOptions {
            files,
            format,
            output,
            first_cycle_only,
        }),
        Commands::Execute {
            file,
            run,
            format,
            output,
        } => execute::run(execute::ExecuteOptions {
            file,
            run,
            format,
            output,
        }),
        Commands::Merge {
            files,
            traces,
            format,
            output,
        } => merge::run(merge::MergeOptions {
            files,
            traces,
            format,
            output,
        }),
        Commands::Trace {
            file,
            traces,
            format,
            output,
        } => trace::run(trace::TraceOptions {
            file,
            traces,
            format,
            output,
        }),
        Commands::Export { file, output } => export::run(export::ExportOptions { file, output }),
    }
}
