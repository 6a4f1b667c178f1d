use std::path::PathBuf;

use anyhow::Result;

use super::{load_graphs, open_writer};
use crate::analysis::{CycleDetector, Freedom};
use crate::config::DcrConfig;
use crate::graph::DcrGraph;
use crate::io::output::{AnalysisReport, FreedomReport, GraphSummary};
use crate::io::OutputFormat;

pub struct AnalyzeOptions {
    pub files: Vec<PathBuf>,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub first_cycle_only: bool,
}

pub fn run(options: AnalyzeOptions) -> Result<()> {
    let config = DcrConfig::load();
    let graphs = load_graphs(&options.files)?;

    let enumerate = config.enumerate_cycles() && !options.first_cycle_only;
    let summaries = graphs
        .iter()
        .map(|graph| summarize(graph, enumerate))
        .collect();
    let freedom = Freedom::check(&graphs)?;

    let report = AnalysisReport {
        graphs: summaries,
        freedom: FreedomReport::from_freedom(&freedom),
    };

    let mut writer = open_writer(
        options.output.as_deref(),
        config.format_or(options.format),
    )?;
    writer.write_analysis(&report)
}

fn summarize(graph: &DcrGraph, enumerate: bool) -> GraphSummary {
    let indices: Vec<usize> = (0..graph.activity_count()).collect();

    let condition_milestone_cycles = if enumerate {
        CycleDetector::all_condition_milestone_cycles(graph, &indices)
    } else {
        CycleDetector::exists_condition_milestone_cycle(graph, &indices)
            .into_iter()
            .collect()
    };
    let response_cycles = if enumerate {
        CycleDetector::all_response_cycles(graph, &indices)
    } else {
        CycleDetector::exists_response_cycle(graph, &indices)
            .into_iter()
            .collect()
    };

    GraphSummary {
        name: graph.name.clone(),
        activities: graph.activity_names(),
        executable: graph.executable_activity_names(),
        accepting: graph.is_accepting(),
        condition_milestone_cycles: condition_milestone_cycles
            .iter()
            .map(|cycle| CycleDetector::cycle_ids(graph, cycle))
            .collect(),
        response_cycles: response_cycles
            .iter()
            .map(|cycle| CycleDetector::cycle_ids(graph, cycle))
            .collect(),
    }
}
