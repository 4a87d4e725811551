use thiserror::Error;

/// Errors produced while loading a model or service config (E1001–E1004).
#[derive(Debug, Error)]
pub enum ParseError {
    /// E1001: Document root has the wrong shape.
    #[error("E1001: not a valid {0} document")]
    UnknownFormat(&'static str),

    /// E1002: YAML parse error.
    #[error("E1002: parse error: {0}")]
    ParseError(String),

    /// E1003: Unresolved type reference.
    #[error("E1003: unresolved type reference: {0}")]
    UnresolvedType(String),

    /// E1004: Structural error in an otherwise well-formed document.
    #[error("E1004: schema error: {0}")]
    SchemaError(String),

    /// I/O error reading an input file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
