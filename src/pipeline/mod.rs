//! Pipeline orchestration: gate, load, compile, write, strip, scan.
//!
//! Integrity and metadata failures abort before any artifact is
//! written. Once artifacts exist, each format's write/strip/scan leg is
//! independent — one leg failing is logged and does not stop the rest.

use std::fs;
use std::path::Path;

use crate::artifact;
use crate::compiler::{self, RuleArtifact};
use crate::config::Config;
use crate::error::Result;
use crate::indicator::{self, RowWarning};
use crate::integrity::Component;
use crate::metadata::MetadataContext;
use crate::scanner::{self, Outcome, ScannerKind};

/// Per-format result of the write/strip/scan leg.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ArtifactReport {
    pub format: compiler::ArtifactFormat,
    pub path: Option<String>,
    pub record_count: usize,
    /// Write or strip failure, if the leg died before scanning.
    pub error: Option<String>,
}

/// Per-scanner result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScanReport {
    pub scanner: ScannerKind,
    pub outcome: Option<Outcome>,
    pub log_path: Option<String>,
    pub error: Option<String>,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunReport {
    pub records: usize,
    pub row_warnings: Vec<RowWarning>,
    pub artifacts: Vec<ArtifactReport>,
    pub scans: Vec<ScanReport>,
}

/// Execute the full pipeline against a configuration.
///
/// Sequence: verify table component, parse records, verify metadata
/// component, load context, write companion document, compile all
/// formats, then per format write + strip + (optionally) scan.
pub fn execute(config: &Config) -> Result<RunReport> {
    let now = chrono::Local::now();
    let run_date = now.format("%Y-%m-%d").to_string();

    // Gate each component immediately before its first use.
    Component::new(&config.input).verify()?;
    let (records, row_warnings) = indicator::load_table(&config.input)?;
    tracing::info!(
        records = records.len(),
        skipped = row_warnings.len(),
        table = %config.input.display(),
        "indicator table parsed"
    );

    Component::new(&config.metadata).verify()?;
    let metadata = MetadataContext::load(&config.metadata)?;

    fs::create_dir_all(&config.output_dir)?;
    let doc_path = artifact::metadata_doc_path(&config.output_dir, &config.input);
    let summary = metadata.summary(&now.format("%Y-%m-%d %H:%M:%S").to_string());
    match fs::write(&doc_path, summary) {
        Ok(()) => tracing::info!(path = %doc_path.display(), "metadata companion written"),
        // A side artifact; its loss does not block rule generation.
        Err(e) => tracing::error!(path = %doc_path.display(), error = %e, "companion write failed"),
    }

    let compiled = compiler::compile_all(&records, &metadata);

    let mut artifacts = Vec::new();
    let mut scans = Vec::new();

    for art in &compiled {
        match write_and_strip(config, art) {
            Ok(path) => {
                artifacts.push(ArtifactReport {
                    format: art.format,
                    path: Some(path.display().to_string()),
                    record_count: art.record_count,
                    error: None,
                });
                if let Some(target) = &config.target {
                    let kind = ScannerKind::for_format(art.format);
                    if config.scanners.contains(&kind) {
                        scans.push(scan_one(config, kind, &path, target, &run_date));
                    }
                }
            }
            Err(e) => {
                // Fatal for this artifact only.
                tracing::error!(format = %art.format, error = %e, "artifact leg failed");
                artifacts.push(ArtifactReport {
                    format: art.format,
                    path: None,
                    record_count: art.record_count,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    Ok(RunReport {
        records: records.len(),
        row_warnings,
        artifacts,
        scans,
    })
}

fn write_and_strip(config: &Config, art: &RuleArtifact) -> Result<std::path::PathBuf> {
    let path = artifact::write_artifact(&config.output_dir, &config.input, art)?;
    artifact::strip_preamble(&path, art.header_line_count())?;
    Ok(path)
}

fn scan_one(
    config: &Config,
    kind: ScannerKind,
    rules: &Path,
    target: &Path,
    run_date: &str,
) -> ScanReport {
    let log = match scanner::run(kind, rules, target, run_date) {
        Ok(log) => log,
        Err(e) => {
            tracing::error!(scanner = %kind, error = %e, "scan leg failed");
            return ScanReport {
                scanner: kind,
                outcome: None,
                log_path: None,
                error: Some(e.to_string()),
            };
        }
    };

    let log_path = artifact::findings_log_path(
        &config.output_dir,
        &config.input,
        &kind.to_string(),
        run_date,
    );
    // Every invocation leaves a log, clean runs and missing tools
    // included.
    if let Err(e) = fs::write(&log_path, &log.body) {
        tracing::error!(scanner = %kind, error = %e, "could not write findings log");
        return ScanReport {
            scanner: kind,
            outcome: Some(log.outcome),
            log_path: None,
            error: Some(e.to_string()),
        };
    }

    ScanReport {
        scanner: kind,
        outcome: Some(log.outcome),
        log_path: Some(log_path.display().to_string()),
        error: None,
    }
}

/// Seal every registered component: write checksum companions and
/// normalize permission modes. Operator maintenance, invoked
/// explicitly — the verify gate never does this.
pub fn seal(config: &Config) -> Result<Vec<String>> {
    let mut sealed = Vec::new();
    for path in [&config.input, &config.metadata] {
        let component = Component::new(path);
        component.seal()?;
        sealed.push(component.checksum_source.display().to_string());
    }
    Ok(sealed)
}
