//! Artifact files on disk: path derivation, wholesale regeneration,
//! and the preamble strip that makes a generated file consumable by
//! its scanner.

use std::fs;
use std::path::{Path, PathBuf};

use crate::compiler::{ArtifactFormat, RuleArtifact};
use crate::error::{ForgeError, Result};

/// Output path for one artifact format, derived from the input table's
/// basename: `rules.csv` -> `rules_gitleaks_rules.toml` etc.
pub fn artifact_path(output_dir: &Path, input: &Path, format: ArtifactFormat) -> PathBuf {
    output_dir.join(format!("{}{}", basename(input), format.file_suffix()))
}

/// Companion metadata document path: `<base>_metadata.txt`.
pub fn metadata_doc_path(output_dir: &Path, input: &Path) -> PathBuf {
    output_dir.join(format!("{}_metadata.txt", basename(input)))
}

/// Dated findings log path: `<base>_<scanner>_findings_<YYYY-MM-DD>.log`.
/// Same-day reruns overwrite rather than accumulate.
pub fn findings_log_path(
    output_dir: &Path,
    input: &Path,
    scanner: &str,
    date: &str,
) -> PathBuf {
    output_dir.join(format!("{}_{}_findings_{}.log", basename(input), scanner, date))
}

fn basename(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rules".into())
}

/// Write an artifact, replacing any prior version wholesale. Returns
/// the path written.
pub fn write_artifact(
    output_dir: &Path,
    input: &Path,
    artifact: &RuleArtifact,
) -> Result<PathBuf> {
    let path = artifact_path(output_dir, input, artifact.format);
    if path.exists() {
        fs::remove_file(&path)?;
    }
    fs::write(&path, artifact.text())?;
    tracing::info!(
        path = %path.display(),
        records = artifact.record_count,
        "artifact written"
    );
    Ok(path)
}

/// Delete the first `line_count` lines of `path` in place so the
/// consuming scanner never sees the boilerplate header.
///
/// A `<path>.bak` copy of the pre-strip file is retained before any
/// mutation, and the strip fails loudly rather than truncating when
/// `line_count` exceeds the file's line count.
pub fn strip_preamble(path: &Path, line_count: usize) -> Result<()> {
    if line_count == 0 {
        return Ok(());
    }

    let content = fs::read_to_string(path)?;
    let total = content.lines().count();
    if line_count > total {
        return Err(ForgeError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "refusing to strip {} lines from {} ({} lines total)",
                line_count,
                path.display(),
                total
            ),
        )));
    }

    let backup = backup_path(path);
    fs::copy(path, &backup)?;

    let body: String = content
        .lines()
        .skip(line_count)
        .flat_map(|l| [l, "\n"])
        .collect();
    fs::write(path, body)?;
    tracing::debug!(path = %path.display(), stripped = line_count, "preamble stripped");
    Ok(())
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".bak");
    path.with_file_name(name)
}
