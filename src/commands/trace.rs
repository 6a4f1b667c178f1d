use std::path::PathBuf;

use anyhow::Result;

use super::{attach_traces, load_graph, load_trace_entries, open_writer};
use crate::config::DcrConfig;
use crate::io::output::TraceReport;
use crate::io::OutputFormat;
use crate::merge::TraceOutcome;

pub struct TraceOptions {
    pub file: PathBuf,
    pub traces: PathBuf,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
}

pub fn run(options: TraceOptions) -> Result<()> {
    let config = DcrConfig::load();
    let mut graphs = vec![load_graph(&options.file)?];
    attach_traces(&mut graphs, load_trace_entries(&options.traces)?);
    let mut graph = graphs.pop().expect("graph loaded above");

    let mut outcomes = Vec::with_capacity(graph.stored_traces.len());
    for index in 0..graph.stored_traces.len() {
        let mut trace = graph.stored_traces[index].clone();
        trace.check(&mut graph);
        outcomes.push(TraceOutcome {
            trace: trace.name.clone(),
            graph: graph.name.clone(),
            scope: trace.context.scope,
            passed: trace.passed,
            accepting: trace.accepting.clone(),
        });
        graph.stored_traces[index] = trace;
    }

    let report = TraceReport {
        graph: graph.name.clone(),
        outcomes,
    };

    let mut writer = open_writer(
        options.output.as_deref(),
        config.format_or(options.format),
    )?;
    writer.write_traces(&report)
}
