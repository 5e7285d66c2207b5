//! Search algorithms and move ordering.

pub mod control;
pub mod heuristics;
pub mod negamax;
pub mod ordering;
pub mod tt;

use kingbob_core::{ChessMove, Position};
use tracing::{debug, info};

use control::SearchManager;
use negamax::{INF, SearchContext, negamax};
use tt::TranspositionTable;

/// Deepest iteration the driver will start.
pub const MAX_DEPTH: i32 = 64;

/// Half-width of the first aspiration window, in centipawns.
pub const ASPIRATION_WINDOW: i32 = 40;

/// Default transposition table size in megabytes.
pub const DEFAULT_HASH_MB: usize = 64;

/// Result of a search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Score in centipawns from the side to move's point of view.
    pub score: i32,
    /// `None` when there is no legal move or the search was cancelled before
    /// finishing one.
    pub best_move: Option<ChessMove>,
    /// Principal variation. Starts with `best_move` whenever that is set.
    pub pv: Vec<ChessMove>,
    /// Depth the result was searched to.
    pub depth: i32,
    /// Nodes visited so far in the `think` call. Only filled in by the driver.
    pub nodes: u64,
}

impl SearchResult {
    /// A moveless result carrying only a score.
    pub(crate) fn leaf(score: i32) -> Self {
        Self {
            score,
            best_move: None,
            pv: Vec::new(),
            depth: 0,
            nodes: 0,
        }
    }

    /// Expected reply to the best move, if the PV reaches that far.
    pub fn ponder_move(&self) -> Option<ChessMove> {
        self.pv.get(1).copied()
    }
}

/// Limits of one `think` call besides the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Last depth to search. Clamped to [`MAX_DEPTH`].
    pub max_depth: i32,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
        }
    }
}

/// Iterative-deepening searcher. Owns the transposition table between
/// searches.
pub struct Searcher {
    tt: TranspositionTable,
}

impl Searcher {
    /// Create a searcher with a transposition table of `hash_mb` megabytes.
    pub fn new(hash_mb: usize) -> Self {
        Self {
            tt: TranspositionTable::new(hash_mb),
        }
    }

    /// Clear the transposition table.
    pub fn clear_tt(&mut self) {
        self.tt.clear();
    }

    /// Replace the transposition table with an empty one of `mb` megabytes.
    pub fn resize_tt(&mut self, mb: usize) {
        self.tt = TranspositionTable::new(mb);
    }

    /// Read access to the transposition table.
    pub fn tt(&self) -> &TranspositionTable {
        &self.tt
    }

    /// Run iterative deepening on `pos` until `limits.max_depth` or until
    /// `manager` cancels.
    ///
    /// Calls `on_iter(result, nodes)` each time a depth's result is adopted.
    /// Returns the last adopted result, or `None` if no depth produced a move.
    /// `pos` is left exactly as it was passed in.
    pub fn think<F>(
        &mut self,
        pos: &mut Position,
        limits: &SearchLimits,
        manager: &SearchManager,
        mut on_iter: F,
    ) -> Option<SearchResult>
    where
        F: FnMut(&SearchResult, u64),
    {
        if self.tt.load_factor() >= 1.0 {
            info!(capacity = self.tt.capacity(), "transposition table full, clearing");
            self.tt.clear();
        }

        let mut ctx = SearchContext::new(&mut self.tt, manager);
        let mut best: Option<SearchResult> = None;
        let mut prev_score = 0;

        for depth in 1..=limits.max_depth.clamp(1, MAX_DEPTH) {
            if manager.should_cancel() {
                break;
            }

            let mut result = aspiration_search(pos, depth, prev_score, &mut ctx);

            let adopt = result.best_move.is_some()
                && best.as_ref().is_none_or(|b| result.depth >= b.depth);
            if adopt {
                result.nodes = ctx.nodes;
                ctx.id_move = result.best_move;
                prev_score = result.score;

                debug!(
                    depth,
                    score = result.score,
                    nodes = ctx.nodes,
                    prunes = ctx.prunes,
                    researches = ctx.researches,
                    window_misses = ctx.window_misses,
                    elapsed_ms = manager.elapsed().as_millis() as u64,
                    pv = %format_pv(&result.pv),
                    "iteration adopted"
                );
                on_iter(&result, ctx.nodes);
                best = Some(result);
            }

            if manager.should_cancel() {
                break;
            }
        }

        best
    }
}

/// Search `depth` inside a window around `prev_score`, widening on failure.
///
/// Depth 1 uses the full window. A miss doubles the half-width and searches
/// the same depth again; once a side reaches ±[`INF`] it stays open.
fn aspiration_search(
    pos: &mut Position,
    depth: i32,
    prev_score: i32,
    ctx: &mut SearchContext<'_>,
) -> SearchResult {
    let mut delta = ASPIRATION_WINDOW;
    let (mut alpha, mut beta) = if depth == 1 {
        (-INF, INF)
    } else {
        (
            prev_score.saturating_sub(delta).max(-INF),
            prev_score.saturating_add(delta).min(INF),
        )
    };

    loop {
        let result = negamax(pos, depth, 0, alpha, beta, 0, ctx);
        if ctx.manager.should_cancel() {
            return result;
        }

        let failed_low = result.score <= alpha && alpha > -INF;
        let failed_high = result.score >= beta && beta < INF;
        if !failed_low && !failed_high {
            return result;
        }

        ctx.window_misses += 1;
        delta = delta.saturating_mul(2);
        alpha = prev_score.saturating_sub(delta).max(-INF);
        beta = prev_score.saturating_add(delta).min(INF);
        debug!(depth, alpha, beta, "aspiration window widened");
    }
}

/// Space-separated UCI moves.
pub fn format_pv(pv: &[ChessMove]) -> String {
    pv.iter()
        .map(ChessMove::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

impl std::fmt::Debug for Searcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Searcher").field("tt", &self.tt).finish()
    }
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_MB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use negamax::{MATE_SCORE, MATE_THRESHOLD};

    const SCHOLAR: &str = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";

    fn think_depth(searcher: &mut Searcher, fen: &str, depth: i32) -> Option<SearchResult> {
        let mut pos = Position::from_fen(fen).unwrap();
        let manager = SearchManager::infinite(Arc::new(AtomicBool::new(false)));
        searcher.think(&mut pos, &SearchLimits { max_depth: depth }, &manager, |_, _| {})
    }

    #[test]
    fn depth_1_returns_legal_move_near_zero() {
        let mut searcher = Searcher::new(1);
        let result = think_depth(&mut searcher, kingbob_core::STARTING_FEN, 1).unwrap();
        let pos = Position::startpos();
        let mv = result.best_move.unwrap();
        assert!(pos.pseudo_legal_moves().contains(&mv));
        assert!(result.score.abs() < 100, "score {}", result.score);
    }

    #[test]
    fn finds_mate_in_one() {
        let mut searcher = Searcher::new(1);
        let result = think_depth(&mut searcher, SCHOLAR, 2).unwrap();
        assert_eq!(result.best_move.unwrap().to_string(), "h5f7");
        assert!(result.score >= MATE_SCORE - 2, "score {}", result.score);
    }

    #[test]
    fn mate_score_survives_aspiration() {
        let mut searcher = Searcher::new(1);
        let result = think_depth(&mut searcher, SCHOLAR, 5).unwrap();
        assert_eq!(result.best_move.unwrap().to_string(), "h5f7");
        assert!(result.score > MATE_THRESHOLD);
    }

    #[test]
    fn stalemate_has_no_result() {
        let mut searcher = Searcher::new(1);
        assert!(think_depth(&mut searcher, "k7/2K5/1Q6/8/8/8/8/8 b - - 0 1", 3).is_none());
    }

    #[test]
    fn checkmated_side_has_no_result() {
        let mut searcher = Searcher::new(1);
        assert!(think_depth(&mut searcher, "7k/6Q1/5K2/8/8/8/8/8 b - - 0 1", 3).is_none());
    }

    #[test]
    fn pv_first_move_matches_best_move() {
        let mut searcher = Searcher::new(1);
        let mut pos = Position::startpos();
        let manager = SearchManager::infinite(Arc::new(AtomicBool::new(false)));
        let result = searcher.think(&mut pos, &SearchLimits { max_depth: 4 }, &manager, |r, _| {
            assert_eq!(r.pv.first().copied(), r.best_move);
        });
        let result = result.unwrap();
        assert_eq!(result.pv[0], result.best_move.unwrap());
        assert!(result.ponder_move().is_some());
    }

    #[test]
    fn callback_sees_every_depth() {
        let mut searcher = Searcher::new(1);
        let mut pos = Position::startpos();
        let manager = SearchManager::infinite(Arc::new(AtomicBool::new(false)));
        let mut depths = Vec::new();
        let mut last_nodes = 0;
        searcher.think(&mut pos, &SearchLimits { max_depth: 5 }, &manager, |r, nodes| {
            depths.push(r.depth);
            assert!(nodes >= last_nodes);
            last_nodes = nodes;
        });
        assert_eq!(depths, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn think_restores_position() {
        let mut searcher = Searcher::new(1);
        let mut pos = Position::from_fen(SCHOLAR).unwrap();
        let manager = SearchManager::infinite(Arc::new(AtomicBool::new(false)));
        searcher.think(&mut pos, &SearchLimits { max_depth: 4 }, &manager, |_, _| {});
        assert_eq!(pos.to_fen(), SCHOLAR);
    }

    #[test]
    fn stop_flag_ends_search_early() {
        let mut searcher = Searcher::new(1);
        let mut pos = Position::startpos();
        let flag = Arc::new(AtomicBool::new(false));
        let manager = SearchManager::infinite(Arc::clone(&flag));
        let result = searcher.think(&mut pos, &SearchLimits { max_depth: 64 }, &manager, |r, _| {
            if r.depth >= 2 {
                flag.store(true, Ordering::Release);
            }
        });
        let result = result.unwrap();
        assert!(result.depth <= 3, "stopped at depth {}", result.depth);
    }

    #[test]
    fn pre_stopped_search_has_no_result() {
        let mut searcher = Searcher::new(1);
        let mut pos = Position::startpos();
        let manager = SearchManager::infinite(Arc::new(AtomicBool::new(true)));
        assert!(
            searcher
                .think(&mut pos, &SearchLimits::default(), &manager, |_, _| {})
                .is_none()
        );
    }

    #[test]
    fn warm_table_still_yields_moves() {
        let mut searcher = Searcher::new(1);
        let first = think_depth(&mut searcher, kingbob_core::STARTING_FEN, 4).unwrap();
        let second = think_depth(&mut searcher, kingbob_core::STARTING_FEN, 4).unwrap();
        assert!(first.best_move.is_some());
        assert!(second.best_move.is_some());
        assert_eq!(second.pv.first().copied(), second.best_move);
    }

    #[test]
    fn repeated_position_at_root_still_gets_a_move() {
        let mut pos = Position::startpos();
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"] {
            let mv = pos.parse_move(uci).unwrap();
            assert!(pos.make_move(mv));
        }
        assert!(pos.is_draw());
        let mut searcher = Searcher::new(1);
        let manager = SearchManager::infinite(Arc::new(AtomicBool::new(false)));
        let result = searcher.think(&mut pos, &SearchLimits { max_depth: 3 }, &manager, |_, _| {});
        assert!(result.and_then(|r| r.best_move).is_some());
    }

    #[test]
    fn full_table_is_cleared_before_thinking() {
        let mut searcher = Searcher::new(1);
        let capacity = searcher.tt().capacity();
        for key in 0..capacity as u64 {
            searcher
                .tt
                .store(key, 1, 0, tt::Bound::Exact, None, None);
        }
        assert!(searcher.tt().load_factor() >= 1.0);
        think_depth(&mut searcher, kingbob_core::STARTING_FEN, 1);
        assert!(searcher.tt().load_factor() < 1.0);
    }

    #[test]
    fn aspiration_miss_searches_the_same_depth_again() {
        // A stale score far from the truth forces a fail-high or fail-low.
        for prev_score in [3_000, -3_000] {
            let mut pos = Position::startpos();
            let mut tt = TranspositionTable::new(1);
            let manager = SearchManager::infinite(Arc::new(AtomicBool::new(false)));
            let mut ctx = SearchContext::new(&mut tt, &manager);
            let result = aspiration_search(&mut pos, 3, prev_score, &mut ctx);
            assert!(ctx.window_misses >= 1, "no miss around {prev_score}");
            assert_eq!(result.depth, 3);
            assert!(result.best_move.is_some());
            assert!(result.score.abs() < 3_000 - ASPIRATION_WINDOW, "score {}", result.score);
            assert_eq!(pos.to_fen(), kingbob_core::STARTING_FEN);
        }
    }

    #[test]
    fn depth_one_uses_the_full_window() {
        let mut pos = Position::startpos();
        let mut tt = TranspositionTable::new(1);
        let manager = SearchManager::infinite(Arc::new(AtomicBool::new(false)));
        let mut ctx = SearchContext::new(&mut tt, &manager);
        let result = aspiration_search(&mut pos, 1, 3_000, &mut ctx);
        assert_eq!(ctx.window_misses, 0);
        assert!(result.best_move.is_some());
    }
}
