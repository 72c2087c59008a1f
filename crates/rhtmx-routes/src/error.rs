//! Error types for building and loading routes

use std::path::PathBuf;
use thiserror::Error;

/// Fatal build-time failures; these abort the build
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid route output {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no `_root` shell found for routable directory {dir:?}")]
    MissingShell { dir: PathBuf },

    #[error("entry `{entry}` references `{id}`, which is not in the registry")]
    DanglingReference { entry: String, id: String },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        BuildError::Json {
            path: path.into(),
            source,
        }
    }
}

/// Runtime failure to resolve a deferred unit
///
/// `Clone` because one shared load hands the same outcome to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("failed to load `{id}`: {message}")]
    Resolve { id: String, message: String },

    #[error("`{id}` is not in the loader registry")]
    Unknown { id: String },
}
