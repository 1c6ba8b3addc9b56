use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while resolving and scanning a package tree.
#[derive(Debug, Error)]
pub enum CheckError {
    /// A requested argument names no category or package in the selected trees.
    #[error("'{argument}' is not a valid category or package")]
    Resolution { argument: String },

    /// A tree root is missing or cannot be read.
    #[error("'{}' is not a valid directory", path.display())]
    TreeAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file could not be read or parsed.
    #[error("invalid config file '{}': {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// Overlays were requested but none are configured.
    #[error("no overlays configured")]
    NoTrees,

    /// A read failed inside one package.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CheckError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
