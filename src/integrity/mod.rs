//! Component registry and integrity gate.
//!
//! Every file the pipeline depends on is declared as a [`Component`]
//! and verified — SHA3-512 digest against a sealed companion file plus
//! POSIX permission bits — immediately before its first use. A failed
//! check is fatal; the gate never falls back to an unverified path.

use std::fs;
use std::path::{Path, PathBuf};

use sha3::{Digest, Sha3_512};

use crate::error::{ForgeError, Result};

/// Suffix of the checksum companion paired 1:1 with each component.
pub const CHECKSUM_SUFFIX: &str = "sha3-512";

/// Permission mode required of pipeline inputs.
pub const REQUIRED_MODE: u32 = 0o644;

/// A file the pipeline must trust before use.
#[derive(Debug, Clone)]
pub struct Component {
    /// The file under verification.
    pub path: PathBuf,
    /// Required POSIX permission bits (e.g. `0o644`).
    pub required_mode: u32,
    /// Companion file holding the expected hex digest.
    pub checksum_source: PathBuf,
}

impl Component {
    /// Declare a component with the conventional `<path>.sha3-512`
    /// companion and the standard 0644 mode.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let checksum_source = checksum_companion(&path);
        Self {
            path,
            required_mode: REQUIRED_MODE,
            checksum_source,
        }
    }

    /// Verify this component. Checks run in order: file exists,
    /// companion exists, digest matches (case-insensitive hex),
    /// permission bits match. The first failure is returned; nothing
    /// is retried.
    pub fn verify(&self) -> Result<()> {
        let name = self.path.display().to_string();

        if !self.path.is_file() {
            return Err(ForgeError::Integrity {
                component: name,
                message: "component file does not exist".into(),
            });
        }

        if !self.checksum_source.is_file() {
            return Err(ForgeError::Integrity {
                component: name,
                message: format!(
                    "checksum companion {} does not exist",
                    self.checksum_source.display()
                ),
            });
        }

        let expected = read_expected_digest(&self.checksum_source)?;
        let actual = digest_file(&self.path)?;
        if !expected.eq_ignore_ascii_case(&actual) {
            return Err(ForgeError::Integrity {
                component: name,
                message: format!(
                    "digest mismatch: expected {}, computed {}",
                    expected, actual
                ),
            });
        }

        self.verify_mode(&name)?;

        tracing::debug!(component = %self.path.display(), "integrity gate passed");
        Ok(())
    }

    #[cfg(unix)]
    fn verify_mode(&self, name: &str) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let mode = fs::metadata(&self.path)?.permissions().mode() & 0o7777;
        if mode != self.required_mode {
            return Err(ForgeError::Integrity {
                component: name.to_string(),
                message: format!(
                    "permission mode {:o} does not match required {:o}",
                    mode, self.required_mode
                ),
            });
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn verify_mode(&self, _name: &str) -> Result<()> {
        // No POSIX mode bits to compare; existence and digest checks
        // still apply.
        Ok(())
    }

    /// Operator maintenance: write the checksum companion for the
    /// current file contents and normalize the permission mode. This
    /// is the sealing step the gate itself never performs.
    pub fn seal(&self) -> Result<()> {
        let digest = digest_file(&self.path)?;
        fs::write(&self.checksum_source, format!("{digest}\n"))?;
        self.apply_mode()?;
        tracing::info!(
            component = %self.path.display(),
            companion = %self.checksum_source.display(),
            "component sealed"
        );
        Ok(())
    }

    #[cfg(unix)]
    fn apply_mode(&self) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(&self.path, fs::Permissions::from_mode(self.required_mode))?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn apply_mode(&self) -> Result<()> {
        Ok(())
    }
}

/// Conventional companion path: `<file>.sha3-512` alongside the file.
pub fn checksum_companion(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push('.');
    name.push_str(CHECKSUM_SUFFIX);
    path.with_file_name(name)
}

/// SHA3-512 over the file's bytes, lowercase hex.
pub fn digest_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(hex::encode(Sha3_512::digest(&bytes)))
}

/// The companion holds a single digest line; a trailing filename (as
/// emitted by `sha3sum`-style tools) is tolerated and ignored.
fn read_expected_digest(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path)?;
    let digest = content
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string();
    if digest.is_empty() {
        return Err(ForgeError::Integrity {
            component: path.display().to_string(),
            message: "checksum companion is empty".into(),
        });
    }
    Ok(digest)
}
