use crate::buffer::{BufferCursor, StringBuffer};

/// A view of the half-open range `[start, end)` of one buffer.
///
/// `length` and `line_feed_cnt` are derived from the cursors when the piece
/// is built and cached so the tree never has to consult the buffer to
/// maintain its aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    buffer_idx: usize,
    start: BufferCursor,
    end: BufferCursor,
    length: usize,
    line_feed_cnt: usize,
}

impl Piece {
    pub fn new(
        buffer_idx: usize,
        buffer: &StringBuffer,
        start: BufferCursor,
        end: BufferCursor,
    ) -> Self {
        let length = buffer.offset_of(end) - buffer.offset_of(start);
        Self {
            buffer_idx,
            start,
            end,
            length,
            line_feed_cnt: end.line - start.line,
        }
    }

    /// A piece spanning all of `buffer`.
    pub fn whole(buffer_idx: usize, buffer: &StringBuffer) -> Self {
        Self::new(
            buffer_idx,
            buffer,
            BufferCursor::new(0, 0),
            buffer.end_cursor(),
        )
    }

    pub fn buffer_idx(&self) -> usize {
        self.buffer_idx
    }

    pub fn start(&self) -> BufferCursor {
        self.start
    }

    pub fn end(&self) -> BufferCursor {
        self.end
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of `'\n'` inside the piece.
    pub fn line_count(&self) -> usize {
        self.line_feed_cnt
    }

    pub fn start_offset(&self, buffer: &StringBuffer) -> usize {
        buffer.offset_of(self.start)
    }

    pub fn end_offset(&self, buffer: &StringBuffer) -> usize {
        buffer.offset_of(self.end)
    }

    pub fn text<'a>(&self, buffer: &'a StringBuffer) -> &'a str {
        &buffer.as_str()[self.start_offset(buffer)..self.end_offset(buffer)]
    }

    /// Partition the piece at `local_offset` bytes from its start. Both halves
    /// reference the same buffer; returns `None` when either half would be
    /// empty.
    pub fn split_at(&self, buffer: &StringBuffer, local_offset: usize) -> Option<(Piece, Piece)> {
        if local_offset == 0 || local_offset >= self.length {
            return None;
        }
        let mid = buffer.cursor_at(self.start_offset(buffer) + local_offset);
        Some((
            Piece::new(self.buffer_idx, buffer, self.start, mid),
            Piece::new(self.buffer_idx, buffer, mid, self.end),
        ))
    }
}
