use std::path::PathBuf;

use anyhow::Result;

use super::{load_graph, open_writer};
use crate::config::DcrConfig;
use crate::io::output::{ExecutionReport, ExecutionStep};
use crate::io::OutputFormat;

pub struct ExecuteOptions {
    pub file: PathBuf,
    pub run: Vec<String>,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
}

pub fn run(options: ExecuteOptions) -> Result<()> {
    let config = DcrConfig::load();
    let mut graph = load_graph(&options.file)?;

    let mut steps = Vec::with_capacity(options.run.len());
    for id in &options.run {
        // an unknown id aborts the whole run with the known-id snapshot
        let fired = graph.execute_by_id(id)?;
        steps.push(ExecutionStep {
            activity: id.clone(),
            fired,
        });
    }

    let report = ExecutionReport {
        graph: graph.name.clone(),
        steps,
        executable: graph.executable_activity_names(),
        accepting: graph.is_accepting(),
        export: graph.export_text(),
    };

    let mut writer = open_writer(
        options.output.as_deref(),
        config.format_or(options.format),
    )?;
    writer.write_execution(&report)
}
