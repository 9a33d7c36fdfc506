use thiserror::Error;

/// Domain errors surfaced through query results. Everything bubbles up as
/// `anyhow::Error`; this enum exists so messages carry a stable kind prefix.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("no database selected: run USE <name> first")]
    NoDatabase,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("internal error: {0}")]
    Internal(String),
}
