use std::path::PathBuf;

/// Errors raised while reading, writing, or reordering an SVD element tree.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML in {path}: {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },

    #[error("{path} does not contain a root element")]
    EmptyDocument { path: PathBuf },

    #[error("unknown element '{0}' for this position in the schema")]
    UnknownTag(String),

    #[error("unknown element '{parent}/{child}'")]
    UnknownChildTag { parent: String, child: String },
}
