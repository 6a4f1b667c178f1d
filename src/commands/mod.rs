//! CLI command implementations
//!
//! One module per subcommand; shared file loading and writer plumbing here.

pub mod analyze;
pub mod execute;
pub mod export;
pub mod merge;
pub mod trace;

use std::fs::{self, File};
use std::io;
use std::path::Path;

use anyhow::{Context as _, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::graph::DcrGraph;
use crate::io::{create_writer, OutputFormat, OutputWriter};
use crate::trace::Trace;

pub(crate) fn load_graph(path: &Path) -> Result<DcrGraph> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("graph");
    DcrGraph::from_source(&raw, name).with_context(|| format!("parsing {}", path.display()))
}

pub(crate) fn load_graphs(paths: &[std::path::PathBuf]) -> Result<Vec<DcrGraph>> {
    paths.iter().map(|path| load_graph(path)).collect()
}

pub(crate) fn open_writer(
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<Box<dyn OutputWriter>> {
    match output {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("creating {}", path.display()))?;
            Ok(create_writer(file, format))
        }
        None => Ok(create_writer(io::stdout(), format)),
    }
}

/// One entry of the on-disk JSON trace file: the owning graph's name (empty
/// means the first graph given) and its recorded traces.
#[derive(Debug, Serialize, Deserialize)]
pub struct TraceFileEntry {
    #[serde(default)]
    pub graph: String,
    pub traces: Vec<Trace>,
}

pub(crate) fn load_trace_entries(path: &Path) -> Result<Vec<TraceFileEntry>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

pub(crate) fn attach_traces(graphs: &mut [DcrGraph], entries: Vec<TraceFileEntry>) {
    for entry in entries {
        let target = if entry.graph.is_empty() {
            graphs.first_mut()
        } else {
            graphs.iter_mut().find(|g| g.name == entry.graph)
        };
        match target {
            Some(graph) => graph.stored_traces.extend(entry.traces),
            None => warn!("trace file references unknown graph '{}'", entry.graph),
        }
    }
}
