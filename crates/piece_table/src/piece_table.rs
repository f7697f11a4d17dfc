//! An in-memory text document stored as a piece table.
//!
//! Inserted text is copied once into an append-only pool of immutable
//! buffers; the document itself is an ordered set of pieces referencing
//! ranges of those buffers. Pieces are kept in a red-black tree whose nodes
//! cache the length and line-feed count of their subtrees, which makes
//! offset and line lookups logarithmic.
//!
//! Offsets, lengths and columns are UTF-8 byte counts. Lines are separated
//! by `'\n'` only.

pub mod buffer;
mod config;
mod error;
pub mod piece;
pub mod tree;

use std::cmp;
use std::fmt;

use tracing::{debug, trace};

use crate::buffer::{BufferPool, split_text_to_chunks};
use crate::piece::Piece;
use crate::tree::PieceTree;

pub use crate::config::{DEFAULT_CHUNK_SIZE, PieceTableConfig};
pub use crate::error::{PieceTableError, Result};

/// A 0-based (line, column) location in the document. `column` is a byte
/// offset from the start of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PieceTable {
    tree: PieceTree,
    buffers: BufferPool,
    config: PieceTableConfig,
}

impl PieceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PieceTableConfig) -> Self {
        Self {
            tree: PieceTree::new(),
            buffers: BufferPool::new(),
            config,
        }
    }

    /// Bulk load: same result as `insert(0, text)` on an empty table.
    pub fn from_text(text: &str) -> Self {
        Self::from_text_with_config(text, PieceTableConfig::default())
    }

    pub fn from_text_with_config(text: &str, config: PieceTableConfig) -> Self {
        let mut table = Self::with_config(config);
        table.insert_unchecked(0, text);
        table
    }

    pub fn config(&self) -> PieceTableConfig {
        self.config
    }

    /// Document length in bytes.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Number of lines; an empty document has one empty line.
    pub fn line_count(&self) -> usize {
        self.tree.line_feed_count() + 1
    }

    pub fn piece_count(&self) -> usize {
        self.tree.node_count()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn insert(&mut self, offset: usize, text: &str) -> Result<&mut Self> {
        self.change(offset, 0, text)
    }

    pub fn remove(&mut self, offset: usize, length: usize) -> Result<&mut Self> {
        self.change(offset, length, "")
    }

    pub fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<&mut Self> {
        self.change(offset, length, text)
    }

    /// Replace `[offset, offset + length)` with `text`.
    ///
    /// Arguments are validated before the tree is touched; on error the
    /// document is unchanged.
    pub fn change(&mut self, offset: usize, length: usize, text: &str) -> Result<&mut Self> {
        trace!(offset, length, text_len = text.len(), "piece table change");
        let end = self.validate_range(offset, length)?;

        if length > 0 {
            self.split_at(offset);
            self.split_at(end);
            self.delete_range(offset, length);
        }
        if !text.is_empty() {
            self.insert_unchecked(offset, text);
        }
        Ok(self)
    }

    fn validate_range(&self, offset: usize, length: usize) -> Result<usize> {
        let document_length = self.len();
        let end = offset
            .checked_add(length)
            .filter(|&end| end <= document_length)
            .ok_or(PieceTableError::OutOfRange {
                offset,
                length,
                document_length,
            })?;
        self.check_char_boundary(offset)?;
        self.check_char_boundary(end)?;
        Ok(end)
    }

    fn check_char_boundary(&self, offset: usize) -> Result<()> {
        let Some(pos) = self.tree.locate_by_offset(offset) else {
            return Ok(());
        };
        let piece = self.tree.piece(pos.node);
        let buffer = self.buffers.get(piece.buffer_idx());
        let local = piece.start_offset(buffer) + (offset - pos.offset);
        if buffer.as_str().is_char_boundary(local) {
            Ok(())
        } else {
            Err(PieceTableError::InvalidArgument(format!(
                "offset {offset} is not on a char boundary"
            )))
        }
    }

    /// Make `offset` a piece boundary.
    fn split_at(&mut self, offset: usize) {
        let Some(pos) = self.tree.locate_by_offset(offset) else {
            return;
        };
        let local = offset - pos.offset;
        if local == 0 {
            return;
        }
        let buffer = self.buffers.get(self.tree.piece(pos.node).buffer_idx());
        self.tree.split(pos.node, local, buffer);
    }

    /// Delete the whole pieces covering `[offset, offset + length)`, last
    /// piece first. Both ends must already be piece boundaries.
    fn delete_range(&mut self, offset: usize, length: usize) {
        let mut remaining = length;
        while remaining > 0 {
            let Some(pos) = self.tree.locate_by_offset(offset + remaining - 1) else {
                break;
            };
            remaining = pos.offset.saturating_sub(offset);
            self.tree.delete(pos.node);
        }
    }

    fn insert_unchecked(&mut self, offset: usize, text: &str) {
        let mut pieces = Vec::new();
        for chunk in split_text_to_chunks(text, self.config.chunk_size()) {
            let buffer_idx = self.buffers.create(chunk.to_string());
            pieces.push(Piece::whole(buffer_idx, self.buffers.get(buffer_idx)));
        }

        if offset == self.len() {
            for piece in pieces {
                self.tree.push_back(piece);
            }
            return;
        }

        let Some(pos) = self.tree.locate_by_offset(offset) else {
            return;
        };
        let mut pieces = pieces.into_iter();
        let Some(first) = pieces.next() else {
            return;
        };

        let local = offset - pos.offset;
        let mut last = if local == 0 {
            self.tree.insert_before(pos.node, first)
        } else {
            let buffer = self.buffers.get(self.tree.piece(pos.node).buffer_idx());
            self.tree.split(pos.node, local, buffer);
            self.tree.insert_after(pos.node, first)
        };
        for piece in pieces {
            last = self.tree.insert_after(last, piece);
        }
    }

    /// The whole document.
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.len());
        self.tree.for_each_inorder(|_, piece| {
            out.push_str(piece.text(self.buffers.get(piece.buffer_idx())));
            true
        });
        out
    }

    pub fn text_range(&self, offset: usize, length: usize) -> Result<String> {
        let end = self.validate_range(offset, length)?;
        let mut out = String::with_capacity(length);
        if length == 0 {
            return Ok(out);
        }

        let mut next = self
            .tree
            .locate_by_offset(offset)
            .map(|pos| (pos.node, pos.offset));
        while let Some((node, node_start)) = next {
            if node_start >= end {
                break;
            }
            let piece = self.tree.piece(node);
            let text = piece.text(self.buffers.get(piece.buffer_idx()));
            let from = offset.saturating_sub(node_start);
            let to = cmp::min(end - node_start, piece.length());
            out.push_str(&text[from..to]);
            next = self
                .tree
                .successor(node)
                .map(|n| (n, node_start + piece.length()));
        }
        Ok(out)
    }

    /// Content of line `line` (0-based) without its terminator.
    pub fn line_content(&self, line: usize) -> Result<String> {
        Ok(self.line_fragments(line)?.concat())
    }

    /// Length in bytes of line `line`, terminator excluded.
    pub fn line_length(&self, line: usize) -> Result<usize> {
        Ok(self.line_fragments(line)?.iter().map(|s| s.len()).sum())
    }

    /// Slices of the buffers that make up one line, in order.
    fn line_fragments(&self, line: usize) -> Result<Vec<&str>> {
        self.check_line(line)?;
        let Some(pos) = self.tree.locate_by_line(line) else {
            return Ok(Vec::new());
        };

        let piece = self.tree.piece(pos.node);
        let buffer = self.buffers.get(piece.buffer_idx());
        let line_starts = buffer.line_starts();
        let start = if pos.local_line == 0 {
            piece.start_offset(buffer)
        } else {
            line_starts[piece.start().line + pos.local_line]
        };

        if pos.local_line < piece.line_count() {
            // the next '\n' is inside this piece too
            let end = line_starts[piece.start().line + pos.local_line + 1] - 1;
            return Ok(vec![&buffer.as_str()[start..end]]);
        }

        let mut fragments = vec![&buffer.as_str()[start..piece.end_offset(buffer)]];
        let mut next = self.tree.successor(pos.node);
        while let Some(node) = next {
            let piece = self.tree.piece(node);
            let buffer = self.buffers.get(piece.buffer_idx());
            if piece.line_count() > 0 {
                let end = buffer.line_starts()[piece.start().line + 1] - 1;
                fragments.push(&buffer.as_str()[piece.start_offset(buffer)..end]);
                break;
            }
            fragments.push(piece.text(buffer));
            next = self.tree.successor(node);
        }
        Ok(fragments)
    }

    /// All lines, terminators excluded.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.line_count());
        let mut current = String::new();

        self.tree.for_each_inorder(|_, piece| {
            let text = piece.text(self.buffers.get(piece.buffer_idx()));
            let mut parts = text.split('\n');
            if let Some(first) = parts.next() {
                current.push_str(first);
            }
            for part in parts {
                lines.push(std::mem::take(&mut current));
                current.push_str(part);
            }
            true
        });

        lines.push(current);
        lines
    }

    fn check_line(&self, line: usize) -> Result<()> {
        let line_count = self.line_count();
        if line >= line_count {
            return Err(PieceTableError::LineOutOfRange { line, line_count });
        }
        Ok(())
    }

    /// Document offset of the first byte of `line`.
    pub fn line_start_offset(&self, line: usize) -> Result<usize> {
        self.check_line(line)?;
        let Some(pos) = self.tree.locate_by_line(line) else {
            return Ok(0);
        };
        if pos.local_line == 0 {
            return Ok(pos.offset);
        }
        let piece = self.tree.piece(pos.node);
        let buffer = self.buffers.get(piece.buffer_idx());
        let line_start = buffer.line_starts()[piece.start().line + pos.local_line];
        Ok(pos.offset + line_start - piece.start_offset(buffer))
    }

    /// Translate a document offset into a (line, column) position.
    /// `offset == len()` is accepted and maps past the last character.
    pub fn position_at(&self, offset: usize) -> Result<Position> {
        let document_length = self.len();
        if offset > document_length {
            return Err(PieceTableError::OutOfRange {
                offset,
                length: 0,
                document_length,
            });
        }

        let line = match self.tree.locate_by_offset(offset) {
            Some(pos) => {
                let piece = self.tree.piece(pos.node);
                let buffer = self.buffers.get(piece.buffer_idx());
                let cursor = buffer.cursor_at(piece.start_offset(buffer) + offset - pos.offset);
                pos.line_feeds + cursor.line - piece.start().line
            }
            None => self.line_count() - 1,
        };
        let column = offset - self.line_start_offset(line)?;
        Ok(Position::new(line, column))
    }

    /// Translate a (line, column) position into a document offset. The
    /// column may point at the end of the line but not beyond it.
    pub fn offset_at(&self, line: usize, column: usize) -> Result<usize> {
        let start = self.line_start_offset(line)?;
        let length = self.line_length(line)?;
        if column > length {
            return Err(PieceTableError::InvalidArgument(format!(
                "column {column} is past the end of line {line} ({length} bytes)"
            )));
        }
        Ok(start + column)
    }

    /// Verify the tree's structural invariants. An error here means the
    /// table is corrupt.
    pub fn check_invariants(&self) -> Result<()> {
        self.tree.check_invariants().inspect_err(|err| {
            debug!(%err, "piece table invariant check failed");
        })
    }
}

impl From<&str> for PieceTable {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl fmt::Display for PieceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut result = Ok(());
        self.tree.for_each_inorder(|_, piece| {
            result = f.write_str(piece.text(self.buffers.get(piece.buffer_idx())));
            result.is_ok()
        });
        result
    }
}
