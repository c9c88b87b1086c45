//! Error types, one enum per concern.
use thiserror::Error;

/// A render-time failure inside one record's IR tree.
///
/// These are generation-time failures: the IR asked for something that cannot
/// be emitted as valid code. Runtime conversion failures (NaN floats, generic
/// encoder errors) live in the generated code and never surface here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmissionError {
    #[error("record `{record}`: {node} node has an empty expression")]
    EmptyExpression { record: String, node: &'static str },

    #[error("record `{record}`: object key must be a quoted string, found {found}")]
    NonStringKey { record: String, found: &'static str },

    #[error("record `{record}`: duplicate object key {key:?}")]
    DuplicateKey { record: String, key: String },
}

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("at JSON path {path} → {message}")]
    Malformed { path: String, message: String },

    #[error("field `{field}` references unknown type `{type_name}`")]
    UnresolvedType { field: String, type_name: String },

    #[error("field `{field}` has kind {kind} but no type name")]
    MissingTypeName { field: String, kind: &'static str },

    #[error("field `{field}` has no type")]
    MissingType { field: String },

    #[error("map entry `{entry}` must declare key and value fields")]
    MalformedMapEntry { entry: String },

    #[error("cannot derive a Go package name for `{file}`")]
    NoPackageName { file: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown option `{0}`")]
    UnknownOption(String),

    #[error("option `{key}` expects true or false, got `{value}`")]
    NotBoolean { key: String, value: String },
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Emission(#[from] EmissionError),

    #[error("`{0}` is not a valid Go identifier")]
    InvalidIdentifier(String),
}
