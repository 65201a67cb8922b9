//! RuleForge — compiles threat-indicator tables into detection-rule
//! artifacts behind an integrity-gated pipeline.
//!
//! One CSV table of indicator records becomes three scanner-native
//! artifacts (Gitleaks TOML, YARA rules, a ripgrep pattern list) plus a
//! provenance companion document. Each input the pipeline trusts is
//! verified (SHA3-512 digest + permission mode) immediately before
//! first use, and generated artifacts can optionally be executed
//! against a target file with the matching external scanners.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use ruleforge::{run, RunOptions};
//!
//! let options = RunOptions::default();
//! let report = run(Path::new("."), &options).unwrap();
//! println!("{} records compiled", report.records);
//! ```

pub mod artifact;
pub mod compiler;
pub mod config;
pub mod error;
pub mod indicator;
pub mod integrity;
pub mod metadata;
pub mod pipeline;
pub mod scanner;

use std::path::{Path, PathBuf};

use config::Config;
use error::Result;
pub use pipeline::RunReport;

/// Options for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Path to config file (defaults to `ruleforge.toml` in the working
    /// directory).
    pub config_path: Option<PathBuf>,
    /// CLI override for the indicator table path.
    pub input_override: Option<PathBuf>,
    /// CLI override for the scan target.
    pub target_override: Option<PathBuf>,
}

/// Resolve configuration for a working directory, applying CLI
/// overrides.
pub fn load_config(dir: &Path, options: &RunOptions) -> Result<Config> {
    let config_path = options
        .config_path
        .clone()
        .unwrap_or_else(|| dir.join("ruleforge.toml"));
    let mut config = Config::load(&config_path)?;

    if let Some(input) = &options.input_override {
        config.input = input.clone();
    }
    if let Some(target) = &options.target_override {
        config.target = Some(target.clone());
    }

    // Relative paths in the config resolve against the working
    // directory, not the process cwd.
    for path in [&mut config.input, &mut config.metadata, &mut config.output_dir] {
        if path.is_relative() {
            *path = dir.join(&*path);
        }
    }
    if let Some(target) = &mut config.target {
        if target.is_relative() {
            *target = dir.join(&*target);
        }
    }

    Ok(config)
}

/// Run the complete pipeline: gate, load, compile, post-process, scan.
pub fn run(dir: &Path, options: &RunOptions) -> Result<RunReport> {
    let config = load_config(dir, options)?;
    pipeline::execute(&config)
}

/// Render a run report as pretty JSON.
pub fn render_report(report: &RunReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod facade_tests {
    use super::*;

    #[test]
    fn overrides_take_precedence_over_defaults() {
        let options = RunOptions {
            config_path: None,
            input_override: Some(PathBuf::from("/abs/table.csv")),
            target_override: Some(PathBuf::from("/abs/sample.bin")),
        };
        let config = load_config(Path::new("/work"), &options).unwrap();
        assert_eq!(config.input, PathBuf::from("/abs/table.csv"));
        assert_eq!(config.target, Some(PathBuf::from("/abs/sample.bin")));
    }

    #[test]
    fn relative_paths_resolve_against_the_working_directory() {
        let config = load_config(Path::new("/work"), &RunOptions::default()).unwrap();
        assert_eq!(config.input, PathBuf::from("/work/asr_rules.csv"));
        assert_eq!(config.metadata, PathBuf::from("/work/rule_metadata.conf"));
    }

    #[test]
    fn report_renders_as_json() {
        let report = RunReport {
            records: 0,
            row_warnings: vec![],
            artifacts: vec![],
            scans: vec![],
        };
        let json = render_report(&report).unwrap();
        assert!(json.contains("\"records\": 0"));
    }
}
