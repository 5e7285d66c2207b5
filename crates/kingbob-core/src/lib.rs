//! Game state for kingbob: a make/unmake position built on the `chess` crate.

mod error;
mod position;

pub use chess::{Board, ChessMove, Color, MoveGen, Piece, Square};
pub use error::PositionError;
pub use position::{MoveGuard, Position, STARTING_FEN};
