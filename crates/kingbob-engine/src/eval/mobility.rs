//! Mobility: a bonus per legal move, weighted by the moving piece.
//!
//! Bishops and rooks earn more per move once the board has emptied out, and
//! king moves are penalised while there is still enough material on the board
//! for the king to be in danger.

use kingbob_core::{Board, MoveGen, Piece};

use crate::eval::phase::GamePhase;
use crate::eval::score::{S, Score};

/// Per-move weights indexed by [`Piece::to_index()`]. The `mg` half applies
/// outside the endgame, the `eg` half inside it.
const MOBILITY_WEIGHT: [Score; 6] = [
    S(0, 0),   // Pawn
    S(0, 0),   // Knight
    S(5, 6),   // Bishop
    S(3, 4),   // Rook
    S(3, 3),   // Queen
    S(-10, 0), // King
];

/// Mobility balance from the side to move's perspective.
///
/// The opponent's moves are counted on the board with the turn passed to
/// them. When the side to move is in check no such board exists and only the
/// side to move is counted.
pub fn mobility(board: &Board, phase: GamePhase) -> i32 {
    let endgame = phase.is_endgame();
    let own = side_mobility(board, endgame);
    let theirs = board
        .null_move()
        .map_or(0, |passed| side_mobility(&passed, endgame));
    own - theirs
}

/// Weighted legal-move count for the side to move on `board`.
fn side_mobility(board: &Board, endgame: bool) -> i32 {
    MoveGen::new_legal(board)
        .filter_map(|mv| board.piece_on(mv.get_source()))
        .map(|piece| weight(piece, endgame))
        .sum()
}

#[inline]
fn weight(piece: Piece, endgame: bool) -> i32 {
    let w = MOBILITY_WEIGHT[piece.to_index()];
    if endgame { w.eg } else { w.mg }
}
