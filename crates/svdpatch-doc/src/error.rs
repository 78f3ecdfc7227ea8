use std::path::PathBuf;

/// Errors raised while loading or resolving a patch document.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{path}: root document must have an '_svd' key naming the SVD file to patch")]
    MissingSvdKey { path: PathBuf },

    #[error("{0} is not a mapping at the document root")]
    NotAMapping(PathBuf),

    #[error("internal error: missing '_path' key while resolving includes")]
    MissingPathKey,
}
