use std::path::PathBuf;

/// All errors produced by stagefs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("Could not parse JSON in file: {path}. Detail: {message}")]
    Parse { path: String, message: String },

    #[error("capability missing: {0}")]
    CapabilityMissing(String),

    #[error("invalid glob pattern: {0}")]
    Pattern(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

impl Error {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_a_directory(path: impl Into<PathBuf>) -> Self {
        Self::NotADirectory(path.into().display().to_string())
    }

    pub fn parse(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.into().display().to_string(),
            message: err.to_string(),
        }
    }

    pub fn capability_missing(msg: impl Into<String>) -> Self {
        Self::CapabilityMissing(msg.into())
    }

    pub fn pattern(pattern: &str, err: impl std::fmt::Display) -> Self {
        Self::Pattern(format!("{}: {}", pattern, err))
    }

    pub fn template(name: &str, err: impl std::fmt::Display) -> Self {
        Self::Template(format!("{}: {}", name, err))
    }

    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {}", path.into().display(), err),
        ))
    }

    /// A source path or pattern that matched nothing.
    pub fn missing_source(from: impl std::fmt::Display) -> Self {
        Self::NotFound(format!(
            "Trying to copy from a source that does not exist: {}",
            from
        ))
    }
}
