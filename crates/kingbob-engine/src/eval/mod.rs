//! Static evaluation: tapered material and piece-square tables, mobility and
//! passed pawns.

pub mod material;
pub mod mobility;
pub mod pawns;
pub mod phase;
pub mod pst;
pub mod score;

use kingbob_core::{Color, Position};

use material::material_value;
use mobility::mobility;
use pawns::passed_pawns;
use phase::game_phase;
use pst::pst_value;
use score::Score;

/// Added to the score of a side that is checkmated.
pub const CHECKMATE_PENALTY: i32 = 5_000;

/// Evaluate `position` in centipawns from the side to move's perspective.
///
/// Material and piece-square values are summed per color as middlegame and
/// endgame halves and blended by [`game_phase`]. Passed pawns and mobility are
/// added untapered. Positions where neither side can mate score 0.
pub fn evaluate(position: &Position) -> i32 {
    if position.is_insufficient_material() {
        return 0;
    }

    let board = position.board();
    let phase = game_phase(board);

    let mut psqt = Score::ZERO;
    for sq in *board.combined() {
        let Some((piece, color)) = position.piece_at(sq) else {
            continue;
        };
        let value = material_value(piece) + pst_value(piece, color, sq);
        match color {
            Color::White => psqt += value,
            Color::Black => psqt -= value,
        }
    }

    let white_relative = psqt.taper(phase) + passed_pawns(board);
    let mut score = match position.side_to_move() {
        Color::White => white_relative,
        Color::Black => -white_relative,
    };

    score += mobility(board, phase);

    if position.in_check() && position.is_mated() {
        score -= CHECKMATE_PENALTY;
    }

    score
}
