use std::convert::Infallible;
use std::str::FromStr;

use piece_table::{PieceTable, PieceTableError, Position};

type Result<T> = std::result::Result<T, PieceTableError>;

/// Editor-facing document handle. Offsets are 0-based bytes; lines and
/// columns are 1-based.
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    table: PieceTable,
}

impl TextBuffer {
    pub fn new(table: PieceTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PieceTable {
        &self.table
    }

    /// Insert `value` at byte `offset` in the document.
    pub fn insert(&mut self, offset: usize, value: &str) -> Result<()> {
        self.table.insert(offset, value).map(|_| ())
    }

    /// Delete `len` bytes starting at byte `offset`.
    pub fn delete(&mut self, offset: usize, len: usize) -> Result<()> {
        self.table.remove(offset, len).map(|_| ())
    }

    pub fn replace(&mut self, offset: usize, len: usize, value: &str) -> Result<()> {
        self.table.replace(offset, len, value).map(|_| ())
    }

    /// Convenience: insert at (line, column), both 1-based.
    pub fn insert_at(&mut self, line: usize, column: usize, value: &str) -> Result<()> {
        let off = self.get_offset_at(line, column)?;
        self.insert(off, value)
    }

    /// Convenience: delete `len` bytes starting at a 1-based (line, column).
    pub fn delete_at(&mut self, line: usize, column: usize, len: usize) -> Result<()> {
        let off = self.get_offset_at(line, column)?;
        self.delete(off, len)
    }

    /// Get complete text content.
    pub fn get_text(&self) -> String {
        self.table.text()
    }

    /// Empty doc => 1 line.
    pub fn get_line_count(&self) -> usize {
        self.table.line_count()
    }

    /// Get the document byte length.
    pub fn get_length(&self) -> usize {
        self.table.len()
    }

    /// Get content of a line (1-based).
    pub fn get_line_content(&self, line_number: usize) -> Result<String> {
        self.table.line_content(self.line_index(line_number)?)
    }

    /// Get all lines (without EOL).
    pub fn get_lines_content(&self) -> Vec<String> {
        self.table.lines()
    }

    /// Get the byte length (without EOL) of a line (1-based).
    pub fn get_line_length(&self, line_number: usize) -> Result<usize> {
        self.table.line_length(self.line_index(line_number)?)
    }

    /// 1-based (line, column) to 0-based byte offset.
    pub fn get_offset_at(&self, line_number: usize, column: usize) -> Result<usize> {
        let column = column.checked_sub(1).ok_or_else(|| {
            PieceTableError::InvalidArgument("columns are 1-based".to_string())
        })?;
        self.table.offset_at(self.line_index(line_number)?, column)
    }

    /// 0-based byte offset to 1-based position.
    pub fn get_position_at(&self, offset: usize) -> Result<Position> {
        let position = self.table.position_at(offset)?;
        Ok(Position::new(position.line + 1, position.column + 1))
    }

    /// UI-friendly: max column on a line (1-based).
    pub fn get_line_max_column(&self, line_number: usize) -> Result<usize> {
        Ok(self.get_line_length(line_number)? + 1)
    }

    fn line_index(&self, line_number: usize) -> Result<usize> {
        line_number
            .checked_sub(1)
            .ok_or(PieceTableError::LineOutOfRange {
                line: 0,
                line_count: self.get_line_count(),
            })
    }
}

impl FromStr for TextBuffer {
    type Err = Infallible;

    /// Build from a single string.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(PieceTable::from(s)))
    }
}
