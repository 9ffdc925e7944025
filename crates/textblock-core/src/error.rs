use thiserror::Error;

/// Errors raised while looking up or instantiating schema types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("content of `{type_name}` does not match `{expected}`: {reason}")]
    ContentModelViolation {
        type_name: String,
        expected: String,
        reason: String,
    },

    #[error("invalid content expression `{expression}`: {message}")]
    InvalidContentExpression { expression: String, message: String },

    #[error("`{type_name}` requires attribute `{attr}`")]
    MissingAttribute { type_name: String, attr: String },

    #[error("duplicate type `{0}`")]
    DuplicateType(String),
}

impl SchemaError {
    pub fn violation(
        type_name: impl Into<String>,
        expected: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ContentModelViolation {
            type_name: type_name.into(),
            expected: expected.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while converting between the block-model tree and the document tree.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("malformed tree: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`{type_name}` at {path:?} is not valid in the {form} form")]
    ForeignTypeName {
        type_name: String,
        form: &'static str,
        path: Vec<usize>,
    },

    #[error("`{type_name}` at {path:?} carries both text and children")]
    TextWithChildren { type_name: String, path: Vec<usize> },

    #[error("document root must be `doc`, found `{0}`")]
    NotADocument(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("duplicate command id: {0}")]
    DuplicateCommand(String),

    #[error("command `{command}` is missing argument `{name}`")]
    MissingArgument { command: String, name: String },

    #[error("command `{command}` got an invalid `{name}`: {reason}")]
    InvalidArgument {
        command: String,
        name: String,
        reason: String,
    },

    #[error("query `{id}` failed: {message}")]
    Query { id: String, message: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Apply(#[from] ApplyError),
}

impl CommandError {
    pub fn missing(command: impl Into<String>, name: impl Into<String>) -> Self {
        Self::MissingArgument {
            command: command.into(),
            name: name.into(),
        }
    }

    pub fn invalid(
        command: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            command: command.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn query(id: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Query {
            id: id.into(),
            message: err.to_string(),
        }
    }
}

/// Errors raised while loading a document into an [`crate::Editor`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
