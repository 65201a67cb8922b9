use thiserror::Error;

pub type Result<T> = std::result::Result<T, ForgeError>;

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Integrity failure for {component}: {message}")]
    Integrity { component: String, message: String },

    #[error("Metadata error: {0}")]
    Config(String),

    #[error("Malformed record at line {line}: {message}")]
    Compile { line: usize, message: String },

    #[error("Scanner error ({scanner}): {message}")]
    Scanner { scanner: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ForgeError {
    /// Process exit code for a fatal error. Integrity and metadata
    /// failures halt the run with 1; anything else reaching the top is
    /// an unexpected condition and exits 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Integrity { .. } | Self::Config(_) => 1,
            _ => 2,
        }
    }
}
