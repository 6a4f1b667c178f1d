use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::load_graph;

pub struct ExportOptions {
    pub file: PathBuf,
    pub output: Option<PathBuf>,
}

pub fn run(options: ExportOptions) -> Result<()> {
    let graph = load_graph(&options.file)?;
    let export = graph.export_text();

    match &options.output {
        Some(path) => {
            fs::write(path, export).with_context(|| format!("writing {}", path.display()))?
        }
        None => print!("{export}"),
    }
    Ok(())
}
