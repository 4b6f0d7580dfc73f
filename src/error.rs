use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

/// Fatal compilation failures. Any of these aborts `compile_model`; no partial
/// mapping is ever returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The document is structurally malformed (missing `shapes`, bad trait
    /// payloads, inconsistent bounds, `required` naming a non-member).
    #[error("malformed model: {0}")]
    ModelLoad(String),

    #[error("shape not found: {0}")]
    ShapeNotFound(String),

    #[error("unsupported shape kind `{kind}` for {id}")]
    UnsupportedShape { id: String, kind: String },
}

impl CompileError {
    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }
}
