//! Provenance metadata: a write-once context loaded from a trusted,
//! integrity-checked source and stamped into every generated rule.
//!
//! Immutability is enforced by the type: the context has no mutating
//! surface and is threaded through the compilers by shared reference.
//! A key bound twice in the source file is treated as a rebinding
//! attempt and fails closed.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::{ForgeError, Result};

/// The fixed provenance key set. Order here is the order fields are
/// rendered in rule headers and the companion document.
pub const KEYS: [&str; 14] = [
    "COPYRIGHT",
    "LICENSE",
    "SHARING",
    "VERSION",
    "AUTHOR",
    "CATEGORY",
    "REFERENCE",
    "SEVERITY",
    "SOURCE",
    "TAG1",
    "TAG2",
    "STATUS",
    "CREATED",
    "MODIFIED",
];

/// Immutable provenance context for one pipeline run.
#[derive(Debug, Clone)]
pub struct MetadataContext {
    pub copyright: String,
    pub license: String,
    pub sharing: String,
    pub version: String,
    pub author: String,
    pub category: String,
    pub reference: String,
    pub severity: String,
    pub source: String,
    pub tag1: String,
    pub tag2: String,
    pub status: String,
    pub created: String,
    pub modified: String,
}

impl MetadataContext {
    /// Load the context from a strict flat `KEY=value` file.
    ///
    /// The caller is responsible for having passed the file through the
    /// integrity gate first. All 14 keys must be bound exactly once;
    /// unknown keys and rebindings fail closed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut bindings: Vec<(String, String)> = Vec::new();

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ForgeError::Config(format!(
                    "line {}: expected KEY=value, got {:?}",
                    idx + 1,
                    raw
                )));
            };
            let key = key.trim().to_uppercase();
            let value = value.trim().to_string();

            if !KEYS.contains(&key.as_str()) {
                return Err(ForgeError::Config(format!(
                    "line {}: unknown metadata key {:?}",
                    idx + 1,
                    key
                )));
            }
            if bindings.iter().any(|(k, _)| k == &key) {
                return Err(ForgeError::Config(format!(
                    "line {}: key {} is bound twice — metadata must be immutable",
                    idx + 1,
                    key
                )));
            }
            bindings.push((key, value));
        }

        let missing: Vec<&str> = KEYS
            .iter()
            .copied()
            .filter(|k| !bindings.iter().any(|(key, _)| key == k))
            .collect();
        if !missing.is_empty() {
            return Err(ForgeError::Config(format!(
                "missing metadata keys: {}",
                missing.join(", ")
            )));
        }

        let get = |k: &str| -> String {
            bindings
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };

        let ctx = Self {
            copyright: get("COPYRIGHT"),
            license: get("LICENSE"),
            sharing: get("SHARING"),
            version: get("VERSION"),
            author: get("AUTHOR"),
            category: get("CATEGORY"),
            reference: get("REFERENCE"),
            severity: get("SEVERITY"),
            source: get("SOURCE"),
            tag1: get("TAG1"),
            tag2: get("TAG2"),
            status: get("STATUS"),
            created: get("CREATED"),
            modified: get("MODIFIED"),
        };
        ctx.validate()?;
        Ok(ctx)
    }

    fn validate(&self) -> Result<()> {
        // REFERENCE may legitimately be blank; everything else must
        // carry a value so rules are never stamped with partial
        // provenance.
        for (key, value) in self.fields() {
            if key != "REFERENCE" && value.is_empty() {
                return Err(ForgeError::Config(format!(
                    "metadata key {key} is bound but empty"
                )));
            }
        }
        for (key, value) in [("CREATED", &self.created), ("MODIFIED", &self.modified)] {
            if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
                return Err(ForgeError::Config(format!(
                    "metadata key {key} must be a YYYY-MM-DD date, got {value:?}"
                )));
            }
        }
        Ok(())
    }

    /// All fields in canonical order, paired with their key names.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("COPYRIGHT", self.copyright.as_str()),
            ("LICENSE", self.license.as_str()),
            ("SHARING", self.sharing.as_str()),
            ("VERSION", self.version.as_str()),
            ("AUTHOR", self.author.as_str()),
            ("CATEGORY", self.category.as_str()),
            ("REFERENCE", self.reference.as_str()),
            ("SEVERITY", self.severity.as_str()),
            ("SOURCE", self.source.as_str()),
            ("TAG1", self.tag1.as_str()),
            ("TAG2", self.tag2.as_str()),
            ("STATUS", self.status.as_str()),
            ("CREATED", self.created.as_str()),
            ("MODIFIED", self.modified.as_str()),
        ]
    }

    /// Render the human-readable companion document summarizing the
    /// run's provenance. A side artifact; nothing downstream consumes
    /// it.
    pub fn summary(&self, generated_on: &str) -> String {
        let mut out = String::new();
        out.push_str("Rule generation metadata\n");
        out.push_str("========================\n");
        out.push_str(&format!("Generated: {generated_on}\n\n"));
        for (key, value) in self.fields() {
            out.push_str(&format!("{key}: {value}\n"));
        }
        out
    }
}
