//! Optional configuration from `.dcrcheck.toml`
//!
//! CLI flags always win over file values; missing files mean defaults.

use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::io::OutputFormat;

pub const CONFIG_FILE: &str = ".dcrcheck.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DcrConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub analyze: AnalyzeConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Default output format when no `--format` flag is given
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeConfig {
    /// Enumerate every minimal cycle per family instead of only the first
    pub enumerate_cycles: Option<bool>,
}

impl DcrConfig {
    /// Load `.dcrcheck.toml` from the working directory. A missing file is
    /// the default configuration; a malformed one is reported and ignored.
    pub fn load() -> Self {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(contents) = fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                warn!("ignoring malformed {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn format_or(&self, flag: Option<OutputFormat>) -> OutputFormat {
        flag.or(self.output.format).unwrap_or(OutputFormat::Terminal)
    }

    pub fn enumerate_cycles(&self) -> bool {
        self.analyze.enumerate_cycles.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_default() {
        let config = DcrConfig::load_from(Path::new("/nonexistent/.dcrcheck.toml"));
        assert_eq!(config.format_or(None), OutputFormat::Terminal);
        assert!(config.enumerate_cycles());
    }

    #[test]
    fn file_values_apply_and_flags_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[output]\nformat = \"json\"\n[analyze]\nenumerate_cycles = false").unwrap();
        let config = DcrConfig::load_from(file.path());
        assert_eq!(config.format_or(None), OutputFormat::Json);
        assert_eq!(
            config.format_or(Some(OutputFormat::Markdown)),
            OutputFormat::Markdown
        );
        assert!(!config.enumerate_cycles());
    }

    #[test]
    fn malformed_file_is_ignored() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not [valid toml").unwrap();
        let config = DcrConfig::load_from(file.path());
        assert_eq!(config.format_or(None), OutputFormat::Terminal);
    }
}
