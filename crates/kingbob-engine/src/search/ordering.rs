//! Move ordering: iterative-deepening move, hash move, promotions, MVV-LVA
//! captures, killers and piece-square deltas.
//!
//! Every candidate gets a single integer score. Bands are far enough apart
//! that a move never climbs out of its band:
//!
//! | Band              | Score                          |
//! |-------------------|--------------------------------|
//! | ID move           | 60,000                         |
//! | TT move           | 50,000 + stored depth          |
//! | Queen promotion   | 35,000                         |
//! | Capture           | 30,000 + victim − attacker     |
//! | First killer      | 9,000 + PST delta              |
//! | Second killer     | 7,000 + PST delta              |
//! | Other quiet moves | PST delta                      |
//!
//! Quiescence ordering only sees captures and uses its own, smaller scale.

use kingbob_core::{ChessMove, Piece, Position};

use crate::eval::material::mg_value;
use crate::eval::pst::pst_value;

pub const ID_MOVE_SCORE: i32 = 60_000;
pub const TT_MOVE_SCORE: i32 = 50_000;
pub const QUEEN_PROMOTION_SCORE: i32 = 35_000;
pub const CAPTURE_SCORE: i32 = 30_000;
pub const FIRST_KILLER_SCORE: i32 = 9_000;
pub const SECOND_KILLER_SCORE: i32 = 7_000;

const QS_TT_MOVE_SCORE: i32 = 4_000;
const QS_QUEEN_PROMOTION_SCORE: i32 = 2_000;
const QS_CAPTURE_SCORE: i32 = 3_000;

/// What the search already knows about a node, used to rank its moves.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderingHints {
    /// Best root move of the previous iteration. Only set at the root.
    pub id_move: Option<ChessMove>,
    /// Best move from the TT entry for this position, with the entry's depth.
    pub tt_move: Option<(ChessMove, i32)>,
    /// Killer moves for this ply, slot 0 first.
    pub killers: [Option<ChessMove>; 2],
}

/// Rank `candidates` for the main search, best first.
///
/// Each candidate is first tried on the position and taken back straight
/// away; moves the position refuses are dropped. Equal scores keep their
/// generation order.
pub fn order_moves(
    position: &mut Position,
    candidates: Vec<ChessMove>,
    hints: &OrderingHints,
) -> Vec<ChessMove> {
    sort_scored(position, candidates, |pos, mv| score_move(pos, mv, hints))
}

/// Rank captures for quiescence search, best first.
pub fn order_captures(
    position: &mut Position,
    candidates: Vec<ChessMove>,
    tt_move: Option<(ChessMove, i32)>,
) -> Vec<ChessMove> {
    sort_scored(position, candidates, |pos, mv| score_capture(pos, mv, tt_move))
}

fn sort_scored<F>(position: &mut Position, candidates: Vec<ChessMove>, score: F) -> Vec<ChessMove>
where
    F: Fn(&Position, ChessMove) -> i32,
{
    let mut scored: Vec<(ChessMove, i32)> = Vec::with_capacity(candidates.len());
    for mv in candidates {
        if position.play(mv).is_none() {
            continue;
        }
        scored.push((mv, score(&*position, mv)));
    }
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.into_iter().map(|(mv, _)| mv).collect()
}

/// Main-search score of a single move.
pub fn score_move(position: &Position, mv: ChessMove, hints: &OrderingHints) -> i32 {
    if hints.id_move == Some(mv) {
        return ID_MOVE_SCORE;
    }
    if let Some((tt_move, depth)) = hints.tt_move
        && tt_move == mv
    {
        return TT_MOVE_SCORE + depth;
    }
    if mv.get_promotion() == Some(Piece::Queen) {
        return QUEEN_PROMOTION_SCORE;
    }
    if position.is_capture(mv) {
        return CAPTURE_SCORE + mvv_lva(position, mv);
    }

    let killer_bonus = if hints.killers[0] == Some(mv) {
        FIRST_KILLER_SCORE
    } else if hints.killers[1] == Some(mv) {
        SECOND_KILLER_SCORE
    } else {
        0
    };
    killer_bonus + pst_delta(position, mv)
}

/// Quiescence score of a capture.
fn score_capture(position: &Position, mv: ChessMove, tt_move: Option<(ChessMove, i32)>) -> i32 {
    let mut score = QS_CAPTURE_SCORE + mvv_lva(position, mv);
    if let Some((tt_move, depth)) = tt_move
        && tt_move == mv
    {
        score += QS_TT_MOVE_SCORE - depth;
    }
    if mv.get_promotion() == Some(Piece::Queen) {
        score += QS_QUEEN_PROMOTION_SCORE;
    }
    score
}

/// Victim value minus attacker value, in middlegame material terms.
fn mvv_lva(position: &Position, mv: ChessMove) -> i32 {
    let victim = position.captured_piece(mv).map_or(0, mg_value);
    let attacker = position
        .piece_at(mv.get_source())
        .map_or(0, |(piece, _)| mg_value(piece));
    victim - attacker
}

/// Middlegame piece-square gain of moving the piece from its origin to its
/// destination, from the mover's point of view.
fn pst_delta(position: &Position, mv: ChessMove) -> i32 {
    let Some((piece, color)) = position.piece_at(mv.get_source()) else {
        return 0;
    };
    pst_value(piece, color, mv.get_dest()).mg - pst_value(piece, color, mv.get_source()).mg
}
