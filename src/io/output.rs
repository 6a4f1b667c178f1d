use crate::analysis::freedom::{CycleReport, Freedom};
use crate::merge::{PreservationFailure, TraceOutcome};
use clap::ValueEnum;
use colored::*;
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Terminal,
    Json,
    Markdown,
}

/// Per-graph slice of an analysis report.
#[derive(Debug, Clone, Serialize)]
pub struct GraphSummary {
    pub name: String,
    pub activities: Vec<String>,
    pub executable: Vec<String>,
    pub accepting: bool,
    pub condition_milestone_cycles: Vec<Vec<String>>,
    pub response_cycles: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FreedomReport {
    pub free: bool,
    pub deadlocks: Vec<CycleReport>,
    pub livelocks: Vec<CycleReport>,
    pub related_graph: String,
}

impl FreedomReport {
    pub fn from_freedom(freedom: &Freedom) -> Self {
        Self {
            free: freedom.is_free(),
            deadlocks: freedom.deadlocks.clone(),
            livelocks: freedom.livelocks.clone(),
            related_graph: freedom.related_graph.export_text(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub graphs: Vec<GraphSummary>,
    pub freedom: FreedomReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionStep {
    pub activity: String,
    pub fired: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub graph: String,
    pub steps: Vec<ExecutionStep>,
    pub executable: Vec<String>,
    pub accepting: bool,
    pub export: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedExport {
    pub name: String,
    pub export: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub full_merge: String,
    pub event_local_merges: Vec<NamedExport>,
    pub preservation_failures: Vec<PreservationFailure>,
    pub freedom: FreedomReport,
    pub trace_outcomes: Vec<TraceOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceReport {
    pub graph: String,
    pub outcomes: Vec<TraceOutcome>,
}

pub trait OutputWriter {
    fn write_analysis(&mut self, report: &AnalysisReport) -> anyhow::Result<()>;
    fn write_execution(&mut self, report: &ExecutionReport) -> anyhow::Result<()>;
    fn write_merge(&mut self, report: &MergeReport) -> anyhow::Result<()>;
    fn write_traces(&mut self, report: &TraceReport) -> anyhow::Result<()>;
}

pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write_value<T: Serialize>(&mut self, value: &T) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(self.writer, "{json}")?;
        Ok(())
    }
}

impl<W: Write> OutputWriter for JsonWriter<W> {
    fn write_analysis(&mut self, report: &AnalysisReport) -> anyhow::Result<()> {
        self.write_value(report)
    }

    fn write_execution(&mut self, report: &ExecutionReport) -> anyhow::Result<()> {
        self.write_value(report)
    }

    fn write_merge(&mut self, report: &MergeReport) -> anyhow::Result<()> {
        self.write_value(report)
    }

    fn write_traces(&mut self, report: &TraceReport) -> anyhow::Result<()> {
        self.write_value(report)
    }
}

pub struct TerminalWriter<W: Write> {
    writer: W,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write_freedom(&mut self, freedom: &FreedomReport) -> anyhow::Result<()> {
        if freedom.free {
            writeln!(self.writer, "{}", "deadlock/livelock free".green().bold())?;
        } else {
            for deadlock in &freedom.deadlocks {
                writeln!(
                    self.writer,
                    "{} {} [{}]",
                    "deadlock".red().bold(),
                    deadlock.graph,
                    deadlock.activities.join(" -> ")
                )?;
            }
            for livelock in &freedom.livelocks {
                writeln!(
                    self.writer,
                    "{} {} [{}]",
                    "livelock".yellow().bold(),
                    livelock.graph,
                    livelock.activities.join(" -> ")
                )?;
            }
        }
        Ok(())
    }

    fn write_cycles(&mut self, label: &str, cycles: &[Vec<String>]) -> anyhow::Result<()> {
        if cycles.is_empty() {
            writeln!(self.writer, "  {label}: {}", "none".dimmed())?;
        } else {
            for cycle in cycles {
                writeln!(self.writer, "  {label}: {}", cycle.join(" -> "))?;
            }
        }
        Ok(())
    }
}

impl<W: Write> OutputWriter for TerminalWriter<W> {
    fn write_analysis(&mut self, report: &AnalysisReport) -> anyhow::Result<()> {
        for graph in &report.graphs {
            writeln!(self.writer, "{}", graph.name.bold())?;
            writeln!(self.writer, "  activities: {}", graph.activities.join(", "))?;
            writeln!(self.writer, "  executable: {}", graph.executable.join(", "))?;
            writeln!(
                self.writer,
                "  accepting:  {}",
                if graph.accepting {
                    "yes".green()
                } else {
                    "no".red()
                }
            )?;
            self.write_cycles("condition/milestone cycle", &graph.condition_milestone_cycles)?;
            self.write_cycles("response cycle", &graph.response_cycles)?;
        }
        self.write_freedom(&report.freedom)
    }

    fn write_execution(&mut self, report: &ExecutionReport) -> anyhow::Result<()> {
        writeln!(self.writer, "{}", report.graph.bold())?;
        for step in &report.steps {
            let verdict = if step.fired {
                "fired".green()
            } else {
                "blocked".red()
            };
            writeln!(self.writer, "  {} {}", step.activity, verdict)?;
        }
        writeln!(self.writer, "  executable: {}", report.executable.join(", "))?;
        writeln!(
            self.writer,
            "  accepting:  {}",
            if report.accepting {
                "yes".green()
            } else {
                "no".red()
            }
        )?;
        writeln!(self.writer, "{}", report.export)?;
        Ok(())
    }

    fn write_merge(&mut self, report: &MergeReport) -> anyhow::Result<()> {
        writeln!(self.writer, "{}", "full merge".bold())?;
        writeln!(self.writer, "{}", report.full_merge)?;
        for merge in &report.event_local_merges {
            writeln!(self.writer, "{} {}", "event-local merge".bold(), merge.name)?;
            writeln!(self.writer, "{}", merge.export)?;
        }

        if report.preservation_failures.is_empty() {
            writeln!(self.writer, "{}", "all merges preserve behavior".green())?;
        }
        for failure in &report.preservation_failures {
            let what = match (&failure.violation.activity, &failure.violation.relation) {
                (Some(activity), _) => format!("activity '{activity}'"),
                (None, Some(relation)) => format!(
                    "relation \"{}\" {} \"{}\"",
                    relation.from,
                    relation.relation_type.arrow(),
                    relation.to
                ),
                (None, None) => "unspecified".to_string(),
            };
            writeln!(
                self.writer,
                "{} merging {} into {} changes {}",
                "not transparent:".red().bold(),
                failure.merged,
                failure.base,
                what
            )?;
        }

        self.write_freedom(&report.freedom)?;

        for outcome in &report.trace_outcomes {
            self.write_outcome(outcome)?;
        }
        Ok(())
    }

    fn write_traces(&mut self, report: &TraceReport) -> anyhow::Result<()> {
        writeln!(self.writer, "{}", report.graph.bold())?;
        for outcome in &report.outcomes {
            self.write_outcome(outcome)?;
        }
        Ok(())
    }
}

impl<W: Write> TerminalWriter<W> {
    fn write_outcome(&mut self, outcome: &TraceOutcome) -> anyhow::Result<()> {
        let verdict = if outcome.passed {
            "pass".green().bold()
        } else {
            "fail".red().bold()
        };
        writeln!(
            self.writer,
            "trace '{}' on {} ({:?}): {} [{}]",
            outcome.trace,
            outcome.graph,
            outcome.scope,
            verdict,
            outcome.accepting.join(", ")
        )?;
        Ok(())
    }
}

pub struct MarkdownWriter<W: Write> {
    writer: W,
}

impl<W: Write> MarkdownWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write_freedom(&mut self, freedom: &FreedomReport) -> anyhow::Result<()> {
        writeln!(self.writer, "## Freedom")?;
        writeln!(self.writer)?;
        if freedom.free {
            writeln!(self.writer, "Deadlock/livelock free.")?;
        } else {
            for deadlock in &freedom.deadlocks {
                writeln!(
                    self.writer,
                    "- **Deadlock** in `{}`: {}",
                    deadlock.graph,
                    deadlock.activities.join(" -> ")
                )?;
            }
            for livelock in &freedom.livelocks {
                writeln!(
                    self.writer,
                    "- **Livelock** in `{}`: {}",
                    livelock.graph,
                    livelock.activities.join(" -> ")
                )?;
            }
        }
        writeln!(self.writer)?;
        Ok(())
    }
}

impl<W: Write> OutputWriter for MarkdownWriter<W> {
    fn write_analysis(&mut self, report: &AnalysisReport) -> anyhow::Result<()> {
        writeln!(self.writer, "# Graph Analysis")?;
        writeln!(self.writer)?;
        for graph in &report.graphs {
            writeln!(self.writer, "## {}", graph.name)?;
            writeln!(self.writer)?;
            writeln!(self.writer, "- Activities: {}", graph.activities.join(", "))?;
            writeln!(self.writer, "- Executable: {}", graph.executable.join(", "))?;
            writeln!(self.writer, "- Accepting: {}", graph.accepting)?;
            for cycle in &graph.condition_milestone_cycles {
                writeln!(
                    self.writer,
                    "- Condition/Milestone cycle: {}",
                    cycle.join(" -> ")
                )?;
            }
            for cycle in &graph.response_cycles {
                writeln!(self.writer, "- Response cycle: {}", cycle.join(" -> "))?;
            }
            writeln!(self.writer)?;
        }
        self.write_freedom(&report.freedom)
    }

    fn write_execution(&mut self, report: &ExecutionReport) -> anyhow::Result<()> {
        writeln!(self.writer, "# Execution of {}", report.graph)?;
        writeln!(self.writer)?;
        for step in &report.steps {
            let verdict = if step.fired { "fired" } else { "blocked" };
            writeln!(self.writer, "- `{}`: {}", step.activity, verdict)?;
        }
        writeln!(self.writer)?;
        writeln!(self.writer, "Executable: {}", report.executable.join(", "))?;
        writeln!(self.writer, "Accepting: {}", report.accepting)?;
        writeln!(self.writer)?;
        writeln!(self.writer, "```\n{}```", report.export)?;
        Ok(())
    }

    fn write_merge(&mut self, report: &MergeReport) -> anyhow::Result<()> {
        writeln!(self.writer, "# Merge Report")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "## Full merge")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "```\n{}```", report.full_merge)?;
        writeln!(self.writer)?;
        for failure in &report.preservation_failures {
            writeln!(
                self.writer,
                "- **Not transparent**: merging `{}` into `{}`",
                failure.merged, failure.base
            )?;
        }
        writeln!(self.writer)?;
        self.write_freedom(&report.freedom)?;
        for outcome in &report.trace_outcomes {
            writeln!(
                self.writer,
                "- Trace `{}` on `{}`: {}",
                outcome.trace,
                outcome.graph,
                if outcome.passed { "pass" } else { "fail" }
            )?;
        }
        Ok(())
    }

    fn write_traces(&mut self, report: &TraceReport) -> anyhow::Result<()> {
        writeln!(self.writer, "# Trace Replay on {}", report.graph)?;
        writeln!(self.writer)?;
        for outcome in &report.outcomes {
            writeln!(
                self.writer,
                "- `{}`: {} ({})",
                outcome.trace,
                if outcome.passed { "pass" } else { "fail" },
                outcome.accepting.join(", ")
            )?;
        }
        Ok(())
    }
}

/// Build a writer for the chosen format over any byte sink.
pub fn create_writer<W: Write + 'static>(writer: W, format: OutputFormat) -> Box<dyn OutputWriter> {
    match format {
        OutputFormat::Json => Box::new(JsonWriter::new(writer)),
        OutputFormat::Terminal => Box::new(TerminalWriter::new(writer)),
        OutputFormat::Markdown => Box::new(MarkdownWriter::new(writer)),
    }
}
