//! External scanner invocation and outcome classification.
//!
//! Each scanner uses its own exit-code convention — several treat
//! "matches found" as a non-zero exit. Classification goes through an
//! explicit per-tool mapping so "scanner found something" is never
//! conflated with "scanner failed". A missing binary is a skippable
//! outcome, not an error.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::compiler::ArtifactFormat;
use crate::error::{ForgeError, Result};

/// The external scanners the pipeline can drive, one per artifact
/// format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerKind {
    Gitleaks,
    Yara,
    Ripgrep,
}

impl ScannerKind {
    pub fn for_format(format: ArtifactFormat) -> Self {
        match format {
            ArtifactFormat::SecretScanRules => Self::Gitleaks,
            ArtifactFormat::SignatureRules => Self::Yara,
            ArtifactFormat::PatternList => Self::Ripgrep,
        }
    }

    /// Binary name resolved through PATH.
    pub fn binary(&self) -> &'static str {
        match self {
            Self::Gitleaks => "gitleaks",
            Self::Yara => "yara",
            Self::Ripgrep => "rg",
        }
    }

    fn args(&self, rules: &Path, target: &Path) -> Vec<String> {
        let r = rules.display().to_string();
        let t = target.display().to_string();
        match self {
            Self::Gitleaks => vec![
                "detect".into(),
                "--no-git".into(),
                "--no-banner".into(),
                "--config".into(),
                r,
                "--source".into(),
                t,
            ],
            Self::Yara => vec![r, t],
            Self::Ripgrep => vec!["--no-config".into(), "-f".into(), r, t],
        }
    }

    /// Per-tool exit-code table. `stdout_len` disambiguates for tools
    /// whose exit status does not encode whether anything matched.
    fn classify(&self, code: Option<i32>, stdout_len: usize) -> Outcome {
        match (self, code) {
            // gitleaks: 1 means leaks found, by convention.
            (Self::Gitleaks, Some(0)) => Outcome::Clean,
            (Self::Gitleaks, Some(1)) => Outcome::Matched,
            // yara exits 0 whether or not rules matched; matches are
            // reported on stdout.
            (Self::Yara, Some(0)) if stdout_len > 0 => Outcome::Matched,
            (Self::Yara, Some(0)) => Outcome::Clean,
            // ripgrep: 0 matched, 1 no matches, 2+ error.
            (Self::Ripgrep, Some(0)) => Outcome::Matched,
            (Self::Ripgrep, Some(1)) => Outcome::Clean,
            _ => Outcome::Crashed,
        }
    }
}

impl std::fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gitleaks => write!(f, "gitleaks"),
            Self::Yara => write!(f, "yara"),
            Self::Ripgrep => write!(f, "ripgrep"),
        }
    }
}

/// What one scanner invocation amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Binary not resolvable; the run continues without this scanner.
    ToolMissing,
    /// Ran, nothing matched.
    Clean,
    /// Ran, findings reported. Not a failure.
    Matched,
    /// Binary present but the invocation failed for a reason other
    /// than "no/some matches".
    Crashed,
}

/// Record of one scanner invocation, destined for a dated log file.
#[derive(Debug, Clone)]
pub struct FindingsLog {
    pub scanner: ScannerKind,
    pub target: PathBuf,
    /// Run date, `YYYY-MM-DD`.
    pub date: String,
    /// Combined stdout+stderr of the invocation, verbatim.
    pub body: String,
    pub outcome: Outcome,
}

/// Invoke one scanner against a target file.
///
/// State machine: check tool present, check inputs exist, invoke,
/// classify. Missing inputs are fatal for this scanner only; a missing
/// binary is not fatal at all.
pub fn run(scanner: ScannerKind, rules: &Path, target: &Path, date: &str) -> Result<FindingsLog> {
    run_with_binary(scanner, scanner.binary(), rules, target, date)
}

fn run_with_binary(
    scanner: ScannerKind,
    binary: &str,
    rules: &Path,
    target: &Path,
    date: &str,
) -> Result<FindingsLog> {
    if !rules.is_file() {
        return Err(ForgeError::Scanner {
            scanner: scanner.to_string(),
            message: format!("rule artifact {} does not exist", rules.display()),
        });
    }
    if !target.is_file() {
        return Err(ForgeError::Scanner {
            scanner: scanner.to_string(),
            message: format!("scan target {} does not exist", target.display()),
        });
    }

    let output = match Command::new(binary).args(scanner.args(rules, target)).output() {
        Ok(output) => output,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(scanner = %scanner, "binary not installed; skipping");
            return Ok(FindingsLog {
                scanner,
                target: target.to_path_buf(),
                date: date.to_string(),
                body: format!("{binary} not installed; scan skipped\n"),
                outcome: Outcome::ToolMissing,
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut body = String::from_utf8_lossy(&output.stdout).into_owned();
    body.push_str(&String::from_utf8_lossy(&output.stderr));

    let outcome = scanner.classify(output.status.code(), output.stdout.len());
    match outcome {
        Outcome::Crashed => tracing::error!(
            scanner = %scanner,
            code = ?output.status.code(),
            "scanner crashed"
        ),
        _ => tracing::info!(scanner = %scanner, outcome = ?outcome, "scan complete"),
    }

    Ok(FindingsLog {
        scanner,
        target: target.to_path_buf(),
        date: date.to_string(),
        body,
        outcome,
    })
}
