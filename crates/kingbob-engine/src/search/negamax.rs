//! Negamax alpha-beta search with PVS, pruning and quiescence.

use std::iter;

use kingbob_core::{ChessMove, Position};

use crate::eval::evaluate;
use crate::eval::phase::game_phase;
use crate::search::SearchResult;
use crate::search::control::SearchManager;
use crate::search::heuristics::KillerTable;
use crate::search::ordering::{OrderingHints, order_captures, order_moves};
use crate::search::tt::{Bound, TranspositionTable, value_from_tt, value_to_tt};

/// Score representing an unreachable upper/lower bound.
pub const INF: i32 = 2_000_000;

/// Base score for checkmate (adjusted by ply for mate distance).
pub const MATE_SCORE: i32 = 1_000_000;

/// Scores above this threshold indicate a forced mate.
pub const MATE_THRESHOLD: i32 = MATE_SCORE - 1_000;

/// Hard ply ceiling. Also sizes the killer table.
pub const MAX_PLY: usize = 100;

/// Cumulative check extensions allowed along one branch.
pub const MAX_EXTENSIONS: i32 = 16;

/// Depth reduction of the null-move search.
pub const NULL_MOVE_REDUCTION: i32 = 2;

/// Reverse futility margin per ply of remaining depth.
pub const RFP_MARGIN: i32 = 150;

/// Reverse futility pruning only applies below this depth.
const RFP_MAX_DEPTH: i32 = 5;

/// Null-move pruning only applies above this depth.
const NULL_MOVE_MIN_DEPTH: i32 = 3;

/// Delta pruning margin: roughly a queen.
pub const BIG_DELTA: i32 = 1_025;

/// Delta pruning is switched off once the endgame weight reaches this.
const DELTA_ENDGAME_LIMIT: i32 = 10;

/// Search state threaded through negamax calls.
///
/// Created once per `think` call and shared by every depth.
pub(super) struct SearchContext<'a> {
    /// Total nodes visited, quiescence included.
    pub nodes: u64,
    /// Nodes cut off by RFP, null move, delta or beta cutoffs.
    pub prunes: u64,
    /// Full-window re-searches after a scout beat alpha.
    pub researches: u64,
    /// Aspiration windows the root score fell outside of.
    pub window_misses: u64,
    pub tt: &'a mut TranspositionTable,
    pub killers: KillerTable,
    /// Best root move of the last adopted iteration.
    pub id_move: Option<ChessMove>,
    pub manager: &'a SearchManager,
}

impl<'a> SearchContext<'a> {
    pub fn new(tt: &'a mut TranspositionTable, manager: &'a SearchManager) -> Self {
        Self {
            nodes: 0,
            prunes: 0,
            researches: 0,
            window_misses: 0,
            tt,
            killers: KillerTable::new(),
            id_move: None,
            manager,
        }
    }
}

/// Negamax alpha-beta search.
///
/// Returns the best score for the side to move together with the best move
/// and principal variation. `pos` is restored before every return, including
/// cancelled ones.
pub(super) fn negamax(
    pos: &mut Position,
    depth: i32,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    extensions: i32,
    ctx: &mut SearchContext<'_>,
) -> SearchResult {
    if depth <= 0 || ply >= MAX_PLY {
        return SearchResult::leaf(qsearch(pos, ply, alpha, beta, ctx));
    }

    ctx.nodes += 1;
    if ctx.manager.should_cancel() {
        return SearchResult::leaf(0);
    }

    if ply > 0 && (pos.is_repetition(1) || pos.is_draw()) {
        return SearchResult::leaf(0);
    }
    let in_check = pos.in_check();
    if !pos.has_legal_moves() {
        return if in_check {
            SearchResult::leaf(-MATE_SCORE + ply as i32)
        } else {
            SearchResult::leaf(0)
        };
    }

    // Transposition table
    let key = pos.hash();
    let mut tt_move = None;
    if let Some(entry) = ctx.tt.get(key) {
        if let Some(mv) = entry.best_move {
            tt_move = Some((mv, entry.depth));
        }
        if ply > 0 && entry.depth >= depth {
            let value = value_from_tt(entry.value, ply);
            let cutoff = match entry.bound {
                Bound::Exact => true,
                Bound::LowerBound => value > beta,
                Bound::UpperBound => value <= alpha,
            };
            if cutoff {
                let pv = match (entry.best_move, &entry.pv) {
                    (Some(mv), Some(pv)) if pv.first() == Some(&mv) => pv.clone(),
                    (Some(mv), _) => vec![mv],
                    (None, _) => Vec::new(),
                };
                return SearchResult {
                    score: value,
                    best_move: entry.best_move,
                    pv,
                    depth: entry.depth,
                    nodes: 0,
                };
            }
        }
    }

    // Pruning on null-window nodes outside of check
    if !in_check && extensions == 0 && beta - alpha == 1 {
        let static_eval = evaluate(pos);

        if depth < RFP_MAX_DEPTH && static_eval > beta + RFP_MARGIN * depth {
            ctx.prunes += 1;
            return SearchResult::leaf(static_eval);
        }

        if depth > NULL_MOVE_MIN_DEPTH
            && static_eval >= beta
            && pos.has_non_pawn_material(pos.side_to_move())
            && let Some(mut child) = pos.play_null()
        {
            let reply = negamax(
                &mut child,
                depth - NULL_MOVE_REDUCTION,
                ply + 1,
                -beta,
                -beta + 1,
                extensions,
                ctx,
            );
            drop(child);
            if ctx.manager.should_cancel() {
                return SearchResult::leaf(0);
            }

            let score = -reply.score;
            if score >= beta {
                ctx.prunes += 1;
                ctx.tt
                    .store(key, depth, value_to_tt(score, ply), Bound::LowerBound, None, None);
                return SearchResult {
                    depth,
                    ..SearchResult::leaf(score)
                };
            }
        }
    }

    let hints = OrderingHints {
        id_move: if ply == 0 { ctx.id_move } else { None },
        tt_move,
        killers: ctx.killers.at(ply),
    };
    let candidates = pos.pseudo_legal_moves();
    let moves = order_moves(pos, candidates, &hints);

    let original_alpha = alpha;
    let mut best = SearchResult {
        score: -INF,
        best_move: None,
        pv: Vec::new(),
        depth,
        nodes: 0,
    };
    let mut searched = 0;

    for mv in moves {
        let capture = pos.is_capture(mv);
        let Some(mut child) = pos.play(mv) else {
            continue;
        };

        let extension = i32::from(extensions < MAX_EXTENSIONS && child.in_check());
        let child_depth = depth - 1 + extension;
        let child_extensions = extensions + extension;

        let reply = if searched == 0 {
            negamax(&mut child, child_depth, ply + 1, -beta, -alpha, child_extensions, ctx)
        } else {
            let scout = negamax(
                &mut child,
                child_depth,
                ply + 1,
                -alpha - 1,
                -alpha,
                child_extensions,
                ctx,
            );
            if -scout.score > alpha && beta - alpha > 1 && !ctx.manager.should_cancel() {
                ctx.researches += 1;
                negamax(&mut child, child_depth, ply + 1, -beta, -alpha, child_extensions, ctx)
            } else {
                scout
            }
        };
        drop(child);
        searched += 1;

        if ctx.manager.should_cancel() {
            if best.best_move.is_none() {
                best.score = 0;
            }
            return best;
        }

        let score = -reply.score;
        if score > best.score {
            best.score = score;
            best.best_move = Some(mv);
            best.pv = iter::once(mv).chain(reply.pv).collect();
        }
        if score > alpha {
            alpha = score;
        }
        if score >= beta {
            ctx.prunes += 1;
            if !capture {
                ctx.killers.store(ply, mv);
            }
            break;
        }
    }

    let bound = if best.score >= beta {
        Bound::LowerBound
    } else if best.score > original_alpha {
        Bound::Exact
    } else {
        Bound::UpperBound
    };
    if best.best_move.is_some() {
        ctx.tt.store(
            key,
            depth,
            value_to_tt(best.score, ply),
            bound,
            best.best_move,
            Some(best.pv.clone()),
        );
    }

    best
}

/// Quiescence search: resolve captures before trusting the static eval.
pub(super) fn qsearch(
    pos: &mut Position,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    ctx: &mut SearchContext<'_>,
) -> i32 {
    ctx.nodes += 1;

    if ctx.manager.should_cancel() {
        return 0;
    }
    if pos.is_draw() {
        return 0;
    }
    if ply >= MAX_PLY {
        return evaluate(pos);
    }

    // Stand pat
    let stand_pat = evaluate(pos);
    if stand_pat >= beta {
        return stand_pat;
    }
    if stand_pat < alpha - BIG_DELTA && game_phase(pos.board()).endgame < DELTA_ENDGAME_LIMIT {
        ctx.prunes += 1;
        return alpha;
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    let tt_move = ctx
        .tt
        .get(pos.hash())
        .and_then(|entry| entry.best_move.map(|mv| (mv, entry.depth)));
    let candidates = pos.captures();
    let captures = order_captures(pos, candidates, tt_move);

    let mut best = stand_pat;
    for mv in captures {
        let Some(mut child) = pos.play(mv) else {
            continue;
        };
        let score = -qsearch(&mut child, ply + 1, -beta, -alpha, ctx);
        drop(child);

        if score >= beta {
            return score;
        }
        if score > best {
            best = score;
        }
        if score > alpha {
            alpha = score;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn manager() -> SearchManager {
        SearchManager::infinite(Arc::new(AtomicBool::new(false)))
    }

    fn search(fen: &str, depth: i32) -> (SearchResult, Position) {
        let mut pos = Position::from_fen(fen).unwrap();
        let mut tt = TranspositionTable::new(1);
        let manager = manager();
        let mut ctx = SearchContext::new(&mut tt, &manager);
        let result = negamax(&mut pos, depth, 0, -INF, INF, 0, &mut ctx);
        (result, pos)
    }

    #[test]
    fn quiet_position_qsearch_is_static_eval() {
        let mut pos = Position::startpos();
        let mut tt = TranspositionTable::new(1);
        let manager = manager();
        let mut ctx = SearchContext::new(&mut tt, &manager);
        let score = qsearch(&mut pos, 0, -INF, INF, &mut ctx);
        assert_eq!(score, evaluate(&pos));
        assert_eq!(ctx.nodes, 1, "no capture should have been searched");
    }

    #[test]
    fn qsearch_wins_hanging_queen() {
        // White rook on d1 can take an undefended queen on d8.
        let fen = "3q3k/8/8/8/8/8/8/3R3K w - - 0 1";
        let mut pos = Position::from_fen(fen).unwrap();
        let mut tt = TranspositionTable::new(1);
        let manager = manager();
        let mut ctx = SearchContext::new(&mut tt, &manager);
        let stand_pat = evaluate(&pos);
        let score = qsearch(&mut pos, 0, -INF, INF, &mut ctx);
        assert!(score > stand_pat + 500, "score {score} vs stand pat {stand_pat}");
        assert_eq!(pos.to_fen(), fen);
    }

    #[test]
    fn mated_side_scores_mate_at_ply() {
        let (result, _) = search("7k/6Q1/5K2/8/8/8/8/8 b - - 0 1", 3);
        assert_eq!(result.score, -MATE_SCORE);
        assert!(result.best_move.is_none());
    }

    #[test]
    fn stalemate_scores_zero() {
        let (result, _) = search("k7/2K5/1Q6/8/8/8/8/8 b - - 0 1", 3);
        assert_eq!(result.score, 0);
        assert!(result.best_move.is_none());
    }

    #[test]
    fn back_rank_mate_in_one() {
        let fen = "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1";
        let (result, pos) = search(fen, 2);
        assert_eq!(result.best_move.map(|mv| mv.to_string()).as_deref(), Some("a1a8"));
        assert!(result.score >= MATE_SCORE - 2, "score {}", result.score);
        assert_eq!(pos.to_fen(), fen);
    }

    #[test]
    fn pv_starts_with_best_move() {
        let (result, _) = search(kingbob_core::STARTING_FEN, 3);
        assert_eq!(result.pv.first().copied(), result.best_move);
        assert!(result.pv.len() >= 2);
    }

    #[test]
    fn root_search_stores_exact_entry() {
        let mut pos = Position::startpos();
        let mut tt = TranspositionTable::new(1);
        let manager = manager();
        let result = {
            let mut ctx = SearchContext::new(&mut tt, &manager);
            negamax(&mut pos, 2, 0, -INF, INF, 0, &mut ctx)
        };
        let entry = tt.get(pos.hash()).expect("root entry");
        assert_eq!(entry.bound, Bound::Exact);
        assert_eq!(entry.best_move, result.best_move);
        assert_eq!(entry.value, result.score);
    }

    #[test]
    fn cancelled_search_returns_no_move_and_restores_position() {
        let mut pos = Position::startpos();
        let before = pos.to_fen();
        let mut tt = TranspositionTable::new(1);
        let manager = SearchManager::infinite(Arc::new(AtomicBool::new(true)));
        let mut ctx = SearchContext::new(&mut tt, &manager);
        let result = negamax(&mut pos, 5, 0, -INF, INF, 0, &mut ctx);
        assert!(result.best_move.is_none());
        assert_eq!(result.score, 0);
        assert_eq!(pos.to_fen(), before);
    }

    #[test]
    fn repetition_below_root_is_a_draw() {
        let mut pos = Position::startpos();
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            let mv = pos.parse_move(uci).unwrap();
            assert!(pos.make_move(mv));
        }
        let mut tt = TranspositionTable::new(1);
        let manager = manager();
        let mut ctx = SearchContext::new(&mut tt, &manager);
        // At ply 1 the repeated start position is scored as a draw.
        let result = negamax(&mut pos, 3, 1, -INF, INF, 0, &mut ctx);
        assert_eq!(result.score, 0);
        assert!(result.best_move.is_none());
    }

    const QUEENS_FEN: &str = "4k3/8/8/8/8/8/QQQ5/4K3 w - - 0 1";

    const BACK_RANK_FEN: &str = "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1";

    #[test]
    fn rule_draw_outranks_mate_below_root() {
        // Mated, but the fifty-move rule already applies.
        let mut pos = Position::from_fen("R5k1/5ppp/8/8/8/8/8/6K1 b - - 100 80").unwrap();
        assert!(pos.is_mated() && pos.is_draw());
        let mut tt = TranspositionTable::new(1);
        let manager = manager();
        let mut ctx = SearchContext::new(&mut tt, &manager);
        assert_eq!(negamax(&mut pos, 3, 1, -INF, INF, 0, &mut ctx).score, 0);
        assert_eq!(negamax(&mut pos, 3, 0, -INF, INF, 0, &mut ctx).score, -MATE_SCORE);
    }

    #[test]
    fn reverse_futility_returns_static_eval() {
        let mut pos = Position::from_fen(QUEENS_FEN).unwrap();
        let mut tt = TranspositionTable::new(1);
        let manager = manager();
        let mut ctx = SearchContext::new(&mut tt, &manager);
        let result = negamax(&mut pos, 2, 1, -1, 0, 0, &mut ctx);
        assert_eq!(result.score, evaluate(&pos));
        assert!(result.best_move.is_none());
        assert_eq!(ctx.nodes, 1);
        assert_eq!(ctx.prunes, 1);
    }

    #[test]
    fn full_window_is_never_futility_pruned() {
        let (result, _) = search(QUEENS_FEN, 2);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn null_move_cutoff_stores_lower_bound_without_move() {
        let mut pos = Position::from_fen(QUEENS_FEN).unwrap();
        let key = pos.hash();
        let mut tt = TranspositionTable::new(1);
        let manager = manager();
        let result = {
            let mut ctx = SearchContext::new(&mut tt, &manager);
            // Depth 5 is past the futility limit, so only the null move can cut.
            let result = negamax(&mut pos, 5, 1, -1, 0, 0, &mut ctx);
            assert!(ctx.prunes >= 1);
            result
        };
        assert!(result.score >= 0, "score {}", result.score);
        assert!(result.best_move.is_none());
        assert_eq!(pos.to_fen(), QUEENS_FEN);

        let entry = tt.get(key).expect("null-move entry");
        assert_eq!(entry.bound, Bound::LowerBound);
        assert_eq!(entry.best_move, None);
        assert_eq!(entry.pv, None);
        assert_eq!(entry.depth, 5);
    }

    #[test]
    fn quiet_cutoffs_fill_killer_slots() {
        let mut pos = Position::startpos();
        let mut tt = TranspositionTable::new(1);
        let manager = manager();
        let mut ctx = SearchContext::new(&mut tt, &manager);
        negamax(&mut pos, 4, 0, -INF, INF, 0, &mut ctx);
        // Black has nothing to capture after White's first move.
        assert!(ctx.killers.at(1)[0].is_some());
        assert!(ctx.prunes > 0);
    }

    #[test]
    fn delta_pruning_fails_low_in_the_middlegame() {
        let mut pos = Position::startpos();
        let mut tt = TranspositionTable::new(1);
        let manager = manager();
        let mut ctx = SearchContext::new(&mut tt, &manager);
        let alpha = evaluate(&pos) + BIG_DELTA + 100;
        assert_eq!(qsearch(&mut pos, 0, alpha, alpha + 1, &mut ctx), alpha);
        assert_eq!(ctx.prunes, 1);
        assert_eq!(ctx.nodes, 1);
    }

    #[test]
    fn delta_pruning_is_off_in_the_endgame() {
        let mut pos = Position::from_fen("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1").unwrap();
        assert!(game_phase(pos.board()).endgame >= DELTA_ENDGAME_LIMIT);
        let mut tt = TranspositionTable::new(1);
        let manager = manager();
        let mut ctx = SearchContext::new(&mut tt, &manager);
        let stand_pat = evaluate(&pos);
        let alpha = stand_pat + BIG_DELTA + 100;
        assert_eq!(qsearch(&mut pos, 0, alpha, alpha + 1, &mut ctx), stand_pat);
        assert_eq!(ctx.prunes, 0);
    }

    #[test]
    fn check_extension_sees_mate_at_depth_one() {
        // Without the extension the mated reply would only reach quiescence.
        let (result, _) = search(BACK_RANK_FEN, 1);
        assert_eq!(result.best_move.map(|mv| mv.to_string()).as_deref(), Some("a1a8"));
        assert_eq!(result.score, MATE_SCORE - 1);
    }

    #[test]
    fn check_extension_stops_at_the_cap() {
        let mut pos = Position::from_fen(BACK_RANK_FEN).unwrap();
        let mut tt = TranspositionTable::new(1);
        let manager = manager();
        let mut ctx = SearchContext::new(&mut tt, &manager);
        let result = negamax(&mut pos, 1, 0, -INF, INF, MAX_EXTENSIONS, &mut ctx);
        assert!(result.best_move.is_some());
        assert!(result.score < MATE_THRESHOLD, "score {}", result.score);
    }

    #[test]
    fn scout_that_beats_alpha_is_searched_again() {
        // King takes g2 is ordered first, the quiet rook mate comes later.
        let mut pos = Position::from_fen("6k1/5ppp/8/8/8/8/6p1/R5K1 w - - 0 1").unwrap();
        let mut tt = TranspositionTable::new(1);
        let manager = manager();
        let mut ctx = SearchContext::new(&mut tt, &manager);
        let result = negamax(&mut pos, 2, 0, -INF, INF, 0, &mut ctx);
        assert_eq!(result.best_move.map(|mv| mv.to_string()).as_deref(), Some("a1a8"));
        assert!(result.score > MATE_THRESHOLD);
        assert!(ctx.researches >= 1);
    }

    #[test]
    fn null_window_scout_is_not_searched_again() {
        let mut pos = Position::from_fen("6k1/5ppp/8/8/8/8/6p1/R5K1 w - - 0 1").unwrap();
        let mut tt = TranspositionTable::new(1);
        let manager = manager();
        let mut ctx = SearchContext::new(&mut tt, &manager);
        negamax(&mut pos, 2, 1, 0, 1, 1, &mut ctx);
        assert_eq!(ctx.researches, 0);
    }
}
