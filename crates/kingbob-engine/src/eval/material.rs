//! Material values.

use kingbob_core::Piece;

use crate::eval::score::{S, Score};

/// Base material values indexed by [`Piece::to_index()`].
///
/// | Piece  | mg   | eg  |
/// |--------|------|-----|
/// | Pawn   | 82   | 94  |
/// | Knight | 337  | 281 |
/// | Bishop | 365  | 297 |
/// | Rook   | 477  | 512 |
/// | Queen  | 1025 | 936 |
/// | King   | 0    | 0   |
pub const MATERIAL_VALUE: [Score; 6] = [
    S(82, 94),    // Pawn
    S(337, 281),  // Knight
    S(365, 297),  // Bishop
    S(477, 512),  // Rook
    S(1025, 936), // Queen
    S(0, 0),      // King
];

/// Material value of `piece`.
#[inline]
pub fn material_value(piece: Piece) -> Score {
    MATERIAL_VALUE[piece.to_index()]
}

/// Middlegame material value of `piece`, used for capture ordering.
#[inline]
pub fn mg_value(piece: Piece) -> i32 {
    MATERIAL_VALUE[piece.to_index()].mg
}
