/// Errors raised while assembling or parsing a map container.
#[derive(Debug, thiserror::Error)]
pub enum ChkError {
    /// A fixed-size slot table (locations, CUWP, WAV) has no free entries
    /// left.
    #[error("{resource} table is full ({capacity} slots)")]
    TableFull {
        /// Name of the exhausted table, for diagnostics.
        resource: &'static str,
        /// The table's fixed capacity.
        capacity: usize,
    },
    /// A chunk's declared length did not match the bytes available to read.
    #[error("chunk \"{tag}\" declares {declared} bytes but only {available} remain")]
    TruncatedChunk {
        /// Four-character chunk tag.
        tag: String,
        /// Length the chunk header declared.
        declared: u32,
        /// Bytes actually remaining in the stream.
        available: usize,
    },
    /// A required chunk was absent from the archive.
    #[error("archive is missing required chunk \"{0}\"")]
    MissingChunk(&'static str),
    /// A record inside a chunk had a field outside its valid range.
    #[error("invalid {field} in {chunk} chunk: {value}")]
    InvalidField {
        /// The chunk that contains the bad record.
        chunk: &'static str,
        /// The field name.
        field: &'static str,
        /// The offending value, formatted for display.
        value: String,
    },
    /// The archive container itself was not well-formed MPQ data.
    #[error("malformed MPQ archive: {0}")]
    MalformedArchive(String),
}

/// Result alias used throughout this crate.
pub type Result<T> = core::result::Result<T, ChkError>;
