use std::path::PathBuf;

use anyhow::Result;

use super::{attach_traces, load_graphs, load_trace_entries, open_writer};
use crate::config::DcrConfig;
use crate::io::output::{FreedomReport, MergeReport, NamedExport};
use crate::io::OutputFormat;
use crate::merge::GraphMerge;

pub struct MergeOptions {
    pub files: Vec<PathBuf>,
    pub traces: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
}

pub fn run(options: MergeOptions) -> Result<()> {
    let config = DcrConfig::load();
    let mut graphs = load_graphs(&options.files)?;

    if let Some(path) = &options.traces {
        attach_traces(&mut graphs, load_trace_entries(path)?);
    }

    let mut merge = GraphMerge::new(graphs)?;
    let trace_outcomes = merge.test_all_traces();

    let report = MergeReport {
        full_merge: merge.full_merge.export_text(),
        event_local_merges: merge
            .event_local_merges
            .iter()
            .map(|graph| NamedExport {
                name: graph.name.clone(),
                export: graph.export_text(),
            })
            .collect(),
        preservation_failures: merge.preservation_failures.clone(),
        freedom: FreedomReport::from_freedom(&merge.freedom),
        trace_outcomes,
    };

    let mut writer = open_writer(
        options.output.as_deref(),
        config.format_or(options.format),
    )?;
    writer.write_merge(&report)
}
