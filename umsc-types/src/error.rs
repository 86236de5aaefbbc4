use crate::RegisterId;

/// Errors raised while resolving a named register or switch to its physical
/// slot inside a scope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AliasError {
    /// A name was looked up that no enclosing scope ever declared.
    #[error("invalid register name \"{0}\"")]
    UnknownName(String),
    /// A name resolved to an index outside the fixed register file.
    #[error("array access out of bounds for \"{name}[{index}]\"")]
    OutOfBounds {
        /// The array-typed name that was indexed.
        name: String,
        /// The offending index.
        index: i64,
    },
    /// The scope-local free list ran out of physical registers to allocate.
    #[error("ran out of registers allocating \"{0}\"")]
    Exhausted(String),
    /// A physical register id fell outside the addressable range.
    #[error("register id {0} is not addressable")]
    UnaddressableRegister(RegisterId),
}

/// Result alias for fallible alias-resolution operations.
pub type Result<T> = std::result::Result<T, AliasError>;
