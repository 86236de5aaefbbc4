//! Compiler error taxonomy.
//!
//! A compile session aborts at the first error instead of trying to
//! recover and keep going: triggers are assembled into a small number of
//! fixed-capacity binary tables, so a single bad declaration can leave
//! later passes operating on nonsense (an over-allocated register, a
//! location id that was never reserved) rather than a clean partial
//! result. There is no internal retry or partial-commit path anywhere in
//! this crate.

use umsc_types::AliasError;

/// Any error a compile session can produce, grouped the way the pipeline
/// itself is: a bad input program, a request the target format cannot
/// represent, or a container this crate genuinely cannot encode/decode.
#[derive(Debug, derive_more::Display)]
pub enum CompileError {
    /// The AST itself is malformed: a node referencing a parent it is not
    /// actually attached to, an argument index out of range, or similar
    /// internal-invariant violations that indicate a bug in whatever built
    /// the AST rather than a mistake by the program's author.
    #[display(fmt = "structural error: {_0}")]
    Structural(String),

    /// The program is well-formed but invalid: an undeclared identifier,
    /// wrong argument count or type to an intrinsic, a jump to a label
    /// that is never defined, and so on.
    #[display(fmt = "semantic error: {_0}")]
    Semantic(String),

    /// The program is valid but does not fit the fixed-size resources the
    /// target format provides: more named registers than the alias store
    /// has room for, more than 255 locations, a trigger with more than 64
    /// actions, and so on.
    #[display(fmt = "capacity exceeded: {_0}")]
    Capacity(String),

    /// The map container itself could not be read or written: a missing
    /// chunk, a truncated record, a malformed MPQ header.
    #[display(fmt = "container error: {_0}")]
    Container(String),
}

impl From<AliasError> for CompileError {
    fn from(e: AliasError) -> Self {
        match e {
            AliasError::Exhausted(_) => CompileError::Capacity(e.to_string()),
            other => CompileError::Semantic(other.to_string()),
        }
    }
}

impl From<umsc_chk::ChkError> for CompileError {
    fn from(e: umsc_chk::ChkError) -> Self {
        match e {
            umsc_chk::ChkError::TableFull { .. } => CompileError::Capacity(e.to_string()),
            other => CompileError::Container(other.to_string()),
        }
    }
}

impl std::error::Error for CompileError {}

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, CompileError>;
