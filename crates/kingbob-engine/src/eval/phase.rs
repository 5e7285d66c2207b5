//! Game phase calculation based on remaining non-pawn material.

use kingbob_core::{Board, Piece};

/// Phase value of a full starting complement of non-pawn material.
///
/// Weights: Knight=1, Bishop=1, Rook=2, Queen=4.
/// Starting totals: 4×1 + 4×1 + 4×2 + 2×4 = 24.
pub const MAX_PHASE: i32 = 24;

/// Midgame and endgame weights of a position. The two always sum to
/// [`MAX_PHASE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GamePhase {
    pub midgame: i32,
    pub endgame: i32,
}

impl GamePhase {
    /// Build a phase from its midgame weight, clamped to `0..=MAX_PHASE`.
    pub const fn from_midgame(midgame: i32) -> Self {
        let midgame = if midgame > MAX_PHASE {
            MAX_PHASE
        } else if midgame < 0 {
            0
        } else {
            midgame
        };
        Self {
            midgame,
            endgame: MAX_PHASE - midgame,
        }
    }

    /// More than ten of the twenty-four phase points have left the board.
    #[inline]
    pub fn is_endgame(self) -> bool {
        self.endgame > 10
    }
}

/// Calculate the game phase from non-pawn, non-king material of both sides.
///
/// Promoted pieces cannot push the midgame weight above [`MAX_PHASE`].
///
/// | Piece  | Weight |
/// |--------|--------|
/// | Knight | 1      |
/// | Bishop | 1      |
/// | Rook   | 2      |
/// | Queen  | 4      |
pub fn game_phase(board: &Board) -> GamePhase {
    let knights = board.pieces(Piece::Knight).popcnt() as i32;
    let bishops = board.pieces(Piece::Bishop).popcnt() as i32;
    let rooks = board.pieces(Piece::Rook).popcnt() as i32;
    let queens = board.pieces(Piece::Queen).popcnt() as i32;

    GamePhase::from_midgame(knights + bishops + rooks * 2 + queens * 4)
}
