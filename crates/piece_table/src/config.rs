use crate::error::{PieceTableError, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Construction-time settings for a [`PieceTable`](crate::PieceTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceTableConfig {
    /// Upper bound, in bytes, on the text held by a single buffer.
    /// Inserted text longer than this is split across several buffers.
    chunk_size: usize,
}

impl PieceTableConfig {
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(PieceTableError::InvalidArgument(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Default for PieceTableConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}
