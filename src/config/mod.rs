use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scanner::ScannerKind;

/// Top-level run configuration from `ruleforge.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Indicator table to compile. Conventionally named; one table per
    /// working directory.
    #[serde(default = "default_input")]
    pub input: PathBuf,

    /// Trusted metadata source the provenance context loads from.
    #[serde(default = "default_metadata")]
    pub metadata: PathBuf,

    /// Where artifacts, the companion document, and findings logs land.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// File to scan with the generated artifacts. When unset, the run
    /// stops after artifact generation.
    #[serde(default)]
    pub target: Option<PathBuf>,

    /// Scanners to drive when a target is set.
    #[serde(default = "default_scanners")]
    pub scanners: Vec<ScannerKind>,
}

fn default_input() -> PathBuf {
    PathBuf::from("asr_rules.csv")
}

fn default_metadata() -> PathBuf {
    PathBuf::from("rule_metadata.conf")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_scanners() -> Vec<ScannerKind> {
    vec![ScannerKind::Gitleaks, ScannerKind::Yara, ScannerKind::Ripgrep]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: default_input(),
            metadata: default_metadata(),
            output_dir: default_output_dir(),
            target: None,
            scanners: default_scanners(),
        }
    }
}

impl Config {
    /// Load config from a TOML file. Returns defaults if the file
    /// doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# ruleforge configuration

# Indicator table to compile (first line is a header).
input = "asr_rules.csv"

# Trusted KEY=value provenance source. Must be sealed: `ruleforge seal`.
metadata = "rule_metadata.conf"

# Where artifacts and findings logs are written.
output_dir = "."

# Uncomment to scan a file with the generated artifacts.
# target = "sample.bin"

# Scanners to drive when a target is set.
scanners = ["gitleaks", "yara", "ripgrep"]
"#
    }
}
