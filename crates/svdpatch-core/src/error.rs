/// Structured error taxonomy for the patch engine. Any of these aborts the
/// run before the `.patched` file is written — there are no partial writes.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("could not find peripheral matching '{0}'")]
    MissingPeripheral(String),

    #[error("could not find {peripheral}:{spec}")]
    MissingRegister { peripheral: String, spec: String },

    #[error("could not find {peripheral}:{register}.{spec}")]
    MissingField {
        peripheral: String,
        register: String,
        spec: String,
    },

    #[error("{context}: name collision on '{name}'")]
    NameCollision { context: String, name: String },

    #[error("{context}: {message}")]
    MergeError { context: String, message: String },

    #[error("{peripheral}: {items} cannot be collected into {spec} array")]
    ArrayShapeError {
        peripheral: String,
        items: String,
        spec: String,
    },

    #[error("{peripheral}: field {field} already has enumeratedValues for {usage}")]
    EnumConflict {
        peripheral: String,
        field: String,
        usage: String,
    },

    #[error("enumeratedValue {name}: {message}")]
    EnumShape { name: String, message: String },

    #[error(transparent)]
    UnknownTag(#[from] svdpatch_tree::TreeError),

    #[error(transparent)]
    Load(#[from] svdpatch_doc::DocError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PatchError>;
