use thiserror::Error;

/// Errors produced by [`PieceTable`](crate::PieceTable) operations.
///
/// Argument errors are always reported before the tree is touched, so a
/// failed call leaves the document unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PieceTableError {
    #[error("range {offset}..{offset}+{length} is outside the document (length {document_length})")]
    OutOfRange {
        offset: usize,
        length: usize,
        document_length: usize,
    },

    #[error("line {line} is outside the document ({line_count} lines)")]
    LineOutOfRange { line: usize, line_count: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A red-black or metadata invariant does not hold. This is a bug in
    /// the tree code, not something a caller can recover from.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl PieceTableError {
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. } | Self::LineOutOfRange { .. })
    }
}

pub type Result<T> = std::result::Result<T, PieceTableError>;
