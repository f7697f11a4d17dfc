use piece_table::{PieceTable, PieceTableConfig, PieceTableError};
use tracing::debug;

use crate::buffer::TextBuffer;

/// Incrementally assembles a document from already decoded chunks, e.g.
/// the pieces of a file read by the caller.
#[derive(Default, Debug)]
pub struct TextBufferBuilder {
    config: PieceTableConfig,
    chunks: Vec<String>,
}

impl TextBufferBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap on bytes per stored buffer; see [`PieceTableConfig`].
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Result<Self, PieceTableError> {
        self.config = PieceTableConfig::new(chunk_size)?;
        Ok(self)
    }

    /// Accept a chunk of text (may include multiple lines).
    pub fn accept_chunk(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.chunks.push(chunk.to_string());
    }

    /// Finish building and return a `TextBuffer`.
    pub fn finish(self) -> TextBuffer {
        debug!(chunks = self.chunks.len(), "building text buffer");
        let text = self.chunks.concat();
        TextBuffer::new(PieceTable::from_text_with_config(&text, self.config))
    }
}
