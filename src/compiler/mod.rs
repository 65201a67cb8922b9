//! Rule compilation: one canonical indicator record in, three
//! scanner-native rule texts out.
//!
//! Compilation is pure and order-preserving — the same records and
//! metadata always produce byte-identical artifacts, and output record
//! order equals input order. No deduplication, no sorting.

pub mod gitleaks;
pub mod ripgrep;
pub mod yara;

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::indicator::IndicatorRecord;
use crate::metadata::MetadataContext;

/// The three artifact formats the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    SecretScanRules,
    SignatureRules,
    PatternList,
}

impl ArtifactFormat {
    /// Output filename suffix appended to the input basename.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Self::SecretScanRules => "_gitleaks_rules.toml",
            Self::SignatureRules => "_yara_rules.yara",
            Self::PatternList => "_ripgrep_patterns.txt",
        }
    }
}

impl std::fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SecretScanRules => write!(f, "gitleaks"),
            Self::SignatureRules => write!(f, "yara"),
            Self::PatternList => write!(f, "ripgrep"),
        }
    }
}

/// A freshly compiled artifact. The compiler records how many lines of
/// boilerplate header it emitted so the post-processor can strip the
/// preamble without a hard-coded constant.
#[derive(Debug, Clone)]
pub struct RuleArtifact {
    pub format: ArtifactFormat,
    pub header: String,
    pub body: String,
    pub record_count: usize,
}

impl RuleArtifact {
    /// Full artifact text as written to disk.
    pub fn text(&self) -> String {
        format!("{}{}", self.header, self.body)
    }

    /// Number of preamble lines the consuming scanner cannot parse.
    pub fn header_line_count(&self) -> usize {
        self.header.lines().count()
    }
}

/// A format emitter renders the preamble and one rule per record.
pub trait Emitter {
    fn format(&self) -> ArtifactFormat;

    /// Boilerplate header stamped with the provenance context. May be
    /// empty for formats with no header syntax.
    fn header(&self, metadata: &MetadataContext) -> String;

    /// Render one record as a rule in this format.
    fn emit_rule(&self, record: &IndicatorRecord, metadata: &MetadataContext) -> String;
}

/// All format emitters, in artifact output order.
pub fn all_emitters() -> Vec<Box<dyn Emitter>> {
    vec![
        Box::new(gitleaks::GitleaksEmitter),
        Box::new(yara::YaraEmitter),
        Box::new(ripgrep::RipgrepEmitter),
    ]
}

/// Fold a record sequence through one emitter.
pub fn compile(
    records: &[IndicatorRecord],
    metadata: &MetadataContext,
    emitter: &dyn Emitter,
) -> RuleArtifact {
    let body = records
        .iter()
        .map(|r| emitter.emit_rule(r, metadata))
        .collect::<String>();

    RuleArtifact {
        format: emitter.format(),
        header: emitter.header(metadata),
        body,
        record_count: records.len(),
    }
}

/// Compile every format. Duplicate signature-rule names (duplicate ids,
/// or distinct ids the sanitizer collapses together) are legal output
/// but worth surfacing to the operator.
pub fn compile_all(records: &[IndicatorRecord], metadata: &MetadataContext) -> Vec<RuleArtifact> {
    let mut seen = HashSet::new();
    for record in records {
        let name = yara::rule_name(record, metadata);
        if !seen.insert(name.clone()) {
            tracing::warn!(rule = %name, id = %record.id, "duplicate signature rule name");
        }
    }

    all_emitters()
        .iter()
        .map(|e| compile(records, metadata, e.as_ref()))
        .collect()
}

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]").unwrap());

/// Replace every character outside `[A-Za-z0-9]` with `_`. Idempotent.
pub fn sanitize_identifier(raw: &str) -> String {
    NON_ALNUM.replace_all(raw, "_").into_owned()
}
