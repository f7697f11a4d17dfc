use std::cmp;

use unicode_segmentation::GraphemeCursor;

/// A (line, column) coordinate inside a single buffer.
///
/// `line` indexes the buffer's `line_starts`, `column` is a byte count from
/// that line's first byte and never crosses into the next line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BufferCursor {
    pub line: usize,
    pub column: usize,
}

impl BufferCursor {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// An immutable chunk of text plus the offsets where each of its lines begins.
#[derive(Debug, Clone)]
pub struct StringBuffer {
    buffer: String,
    line_starts: Vec<usize>,
}

impl StringBuffer {
    pub fn new(buffer: String) -> Self {
        let line_starts = Self::create_line_starts(&buffer);
        Self {
            buffer,
            line_starts,
        }
    }

    /// Offset 0 plus every offset directly following a `'\n'`.
    pub fn create_line_starts(text: &str) -> Vec<usize> {
        let mut line_starts = vec![0];
        for (i, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(i + 1);
            }
        }
        line_starts
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn offset_of(&self, cursor: BufferCursor) -> usize {
        self.line_starts[cursor.line] + cursor.column
    }

    /// Inverse of [`offset_of`](Self::offset_of). An offset right after a
    /// `'\n'` maps to column 0 of the following line.
    pub fn cursor_at(&self, offset: usize) -> BufferCursor {
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        BufferCursor::new(line, offset - self.line_starts[line])
    }

    pub fn end_cursor(&self) -> BufferCursor {
        let last = self.line_starts.len() - 1;
        BufferCursor::new(last, self.buffer.len() - self.line_starts[last])
    }
}

/// Append-only storage for every buffer a table has ever created.
/// A buffer id is its index and stays valid for the lifetime of the pool.
#[derive(Debug, Clone, Default)]
pub struct BufferPool {
    buffers: Vec<StringBuffer>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, text: String) -> usize {
        self.buffers.push(StringBuffer::new(text));
        self.buffers.len() - 1
    }

    pub fn get(&self, buffer_idx: usize) -> &StringBuffer {
        &self.buffers[buffer_idx]
    }

    pub fn line_count(&self, buffer_idx: usize) -> usize {
        self.buffers[buffer_idx].line_count()
    }

    pub fn absolute_offset(&self, buffer_idx: usize, cursor: BufferCursor) -> usize {
        self.buffers[buffer_idx].offset_of(cursor)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// Cut `text` into consecutive slices of at most `chunk_size` bytes.
///
/// Cuts land on grapheme boundaries when one exists inside the window,
/// otherwise on the closest char boundary. A chunk only exceeds
/// `chunk_size` when a single codepoint is wider than it.
pub fn split_text_to_chunks(text: &str, chunk_size: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let end = chunk_end(text, start, chunk_size);
        chunks.push(&text[start..end]);
        start = end;
    }
    chunks
}

fn chunk_end(text: &str, start: usize, chunk_size: usize) -> usize {
    let target = cmp::min(start.saturating_add(chunk_size), text.len());
    if target == text.len() {
        return target;
    }

    let mut end = target;
    while end > start && !text.is_char_boundary(end) {
        end -= 1;
    }
    if end == start {
        // codepoint wider than the chunk size
        end = start + 1;
        while !text.is_char_boundary(end) {
            end += 1;
        }
        return end;
    }

    let mut cursor = GraphemeCursor::new(end, text.len(), true);
    if cursor.is_boundary(text, 0).unwrap_or(true) {
        return end;
    }
    match cursor.prev_boundary(text, 0) {
        Ok(Some(boundary)) if boundary > start => boundary,
        _ => end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_starts_follow_newlines() {
        let buffer = StringBuffer::new("ab\ncd\n\nx".to_string());
        assert_eq!(buffer.line_starts(), &[0, 3, 6, 7]);
        assert_eq!(buffer.line_count(), 4);
        assert_eq!(buffer.end_cursor(), BufferCursor::new(3, 1));
    }

    #[test]
    fn carriage_return_is_plain_text() {
        let buffer = StringBuffer::new("a\r\nb\rc".to_string());
        assert_eq!(buffer.line_starts(), &[0, 3]);
    }

    #[test]
    fn cursor_offset_round_trip() {
        let buffer = StringBuffer::new("one\ntwo\nthree".to_string());
        assert_eq!(buffer.cursor_at(0), BufferCursor::new(0, 0));
        assert_eq!(buffer.cursor_at(3), BufferCursor::new(0, 3));
        assert_eq!(buffer.cursor_at(4), BufferCursor::new(1, 0));
        assert_eq!(buffer.cursor_at(13), BufferCursor::new(2, 5));
        assert_eq!(buffer.offset_of(BufferCursor::new(2, 2)), 10);
    }

    #[test]
    fn pool_ids_are_stable() {
        let mut pool = BufferPool::new();
        let a = pool.create("first\n".to_string());
        let b = pool.create("second".to_string());
        assert_eq!((a, b), (0, 1));
        assert_eq!(pool.get(a).as_str(), "first\n");
        assert_eq!(pool.line_count(a), 2);
        assert_eq!(pool.absolute_offset(a, BufferCursor::new(1, 0)), 6);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn chunks_respect_size() {
        let text = "abcdefghij";
        assert_eq!(split_text_to_chunks(text, 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(split_text_to_chunks(text, 10), vec![text]);
        assert!(split_text_to_chunks("", 4).is_empty());
    }

    #[test]
    fn chunks_never_cut_a_codepoint() {
        let text = "aé€😀b";
        for size in 1..8 {
            let chunks = split_text_to_chunks(text, size);
            assert_eq!(chunks.concat(), text);
            for chunk in &chunks {
                assert!(chunk.len() <= size.max(4));
            }
        }
    }

    #[test]
    fn chunks_prefer_grapheme_boundaries() {
        // "e" + combining acute accent is one grapheme of 3 bytes
        let text = "abe\u{301}cd";
        let chunks = split_text_to_chunks(text, 3);
        assert_eq!(chunks, vec!["ab", "e\u{301}", "cd"]);
    }
}
