mod buffer;
mod buffer_builder;

pub use crate::buffer::TextBuffer;
pub use crate::buffer_builder::TextBufferBuilder;
pub use piece_table::{PieceTableError, Position};
