//! Event-driven UCI engine with a background search thread.

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Duration;

use tracing::{debug, info, warn};

use kingbob_core::{ChessMove, Position};
use kingbob_engine::search::DEFAULT_HASH_MB;
use kingbob_engine::search::negamax::{MATE_SCORE, MATE_THRESHOLD};
use kingbob_engine::search::{MAX_DEPTH, format_pv};
use kingbob_engine::{OpeningBook, SearchLimits, SearchResult, Searcher, manager_from_go};

use crate::command::{Command, GoParams, MAX_HASH_MB, MAX_MOVE_OVERHEAD_MS, UciOption, parse_command};
use crate::error::UciError;

/// Configuration knobs adjustable via `setoption`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Transposition table size in megabytes.
    pub hash_mb: usize,
    /// Answer from the opening book when the position is in it.
    pub own_book: bool,
    /// Reserve subtracted from every time budget.
    pub move_overhead: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hash_mb: DEFAULT_HASH_MB,
            own_book: true,
            move_overhead: Duration::ZERO,
        }
    }
}

/// Events processed by the main engine loop.
enum EngineEvent {
    UciCommand(Result<Command, UciError>),
    SearchDone(SearchDone),
    InputClosed,
    InputFailed(UciError),
}

/// Payload returned by the search thread when it finishes.
struct SearchDone {
    result: Option<SearchResult>,
    position: Position,
    searcher: Searcher,
}

/// The UCI engine, holding the current position and the searcher.
///
/// Runs an event loop on the main thread. Searches run on a worker thread
/// that owns the [`Searcher`] until it reports back.
pub struct UciEngine {
    position: Position,
    searcher: Option<Searcher>,
    book: OpeningBook,
    stop_flag: Arc<AtomicBool>,
    config: EngineConfig,
    pending_clear_tt: bool,
    /// Pending TT resize (MB) to apply when the search thread returns.
    pending_resize_tt: Option<usize>,
}

impl UciEngine {
    /// Create a new engine with the starting position.
    pub fn new() -> Self {
        let config = EngineConfig::default();
        Self {
            position: Position::startpos(),
            searcher: Some(Searcher::new(config.hash_mb)),
            book: OpeningBook::standard(),
            stop_flag: Arc::new(AtomicBool::new(false)),
            config,
            pending_clear_tt: false,
            pending_resize_tt: None,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the UCI event loop, reading from stdin until `quit` or input closes.
    pub fn run(mut self) -> Result<(), UciError> {
        let (tx, rx) = mpsc::channel::<EngineEvent>();

        let stdin_tx = tx.clone();
        std::thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        let _ = stdin_tx.send(EngineEvent::InputFailed(err.into()));
                        return;
                    }
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                debug!(cmd = %trimmed, "received UCI command");
                if stdin_tx
                    .send(EngineEvent::UciCommand(parse_command(trimmed)))
                    .is_err()
                {
                    return;
                }
            }
            let _ = stdin_tx.send(EngineEvent::InputClosed);
        });

        for event in &rx {
            match event {
                EngineEvent::UciCommand(Ok(cmd)) => match cmd {
                    Command::Uci => self.handle_uci(),
                    Command::IsReady => println!("readyok"),
                    Command::UciNewGame => self.handle_ucinewgame(),
                    Command::SetOption(option) => self.handle_setoption(option),
                    Command::Position(position) => self.position = *position,
                    Command::Go(params) => self.handle_go(&params, &tx),
                    Command::Stop => self.stop_flag.store(true, Ordering::Release),
                    Command::Display => println!("{}", self.position),
                    Command::Quit => {
                        if self.searcher.is_some() {
                            break;
                        }
                        // Stop the active search and wait for its bestmove.
                        self.stop_flag.store(true, Ordering::Release);
                        for ev in &rx {
                            if let EngineEvent::SearchDone(done) = ev {
                                self.finish_search(done);
                                break;
                            }
                        }
                        break;
                    }
                    Command::Unknown(cmd) => debug!(%cmd, "ignoring unknown command"),
                },
                EngineEvent::UciCommand(Err(e)) => {
                    warn!(error = %e, "UCI parse error");
                }
                EngineEvent::SearchDone(done) => self.finish_search(done),
                EngineEvent::InputClosed => break,
                EngineEvent::InputFailed(err) => {
                    self.stop_flag.store(true, Ordering::Release);
                    return Err(err);
                }
            }
        }

        info!("kingbob shutting down");
        Ok(())
    }

    fn handle_uci(&self) {
        println!("id name kingbob {}", env!("CARGO_PKG_VERSION"));
        println!("id author the kingbob developers");
        println!(
            "option name Hash type spin default {} min 1 max {MAX_HASH_MB}",
            DEFAULT_HASH_MB
        );
        println!("option name OwnBook type check default true");
        println!("option name Move Overhead type spin default 0 min 0 max {MAX_MOVE_OVERHEAD_MS}");
        println!("uciok");
    }

    fn handle_ucinewgame(&mut self) {
        self.position = Position::startpos();
        match self.searcher.as_mut() {
            Some(searcher) => searcher.clear_tt(),
            // Search thread owns the searcher, defer until it comes back
            None => self.pending_clear_tt = true,
        }
    }

    fn handle_setoption(&mut self, option: UciOption) {
        self.config.apply(option);
        if let UciOption::Hash(mb) = option {
            match self.searcher.as_mut() {
                Some(searcher) => searcher.resize_tt(mb),
                None => self.pending_resize_tt = Some(mb),
            }
        }
        debug!(?option, "option set");
    }

    fn handle_go(&mut self, params: &GoParams, tx: &mpsc::Sender<EngineEvent>) {
        let Some(mut searcher) = self.searcher.take() else {
            warn!("go received while searching, ignoring");
            return;
        };

        if self.config.own_book
            && let Some(mv) = self.book.probe(&self.position)
        {
            info!(%mv, "book move");
            println!("bestmove {mv}");
            self.searcher = Some(searcher);
            return;
        }

        let manager = manager_from_go(
            &params.limits(),
            self.position.side_to_move(),
            self.config.move_overhead,
            Arc::new(AtomicBool::new(false)),
        );
        self.stop_flag = Arc::clone(manager.stop_flag());
        let limits = SearchLimits {
            max_depth: params.depth.unwrap_or(MAX_DEPTH),
        };
        let mut position = self.position.clone();
        let tx = tx.clone();

        std::thread::spawn(move || {
            let result = searcher.think(&mut position, &limits, &manager, |result, nodes| {
                println!("{}", info_line(result, nodes, manager.elapsed()));
            });
            let _ = tx.send(EngineEvent::SearchDone(SearchDone {
                result,
                position,
                searcher,
            }));
        });
    }

    fn finish_search(&mut self, done: SearchDone) {
        let mut searcher = done.searcher;

        if let Some(mb) = self.pending_resize_tt.take() {
            // Resize supersedes clear, a fresh table is already empty
            searcher.resize_tt(mb);
            self.pending_clear_tt = false;
        } else if self.pending_clear_tt {
            searcher.clear_tt();
            self.pending_clear_tt = false;
        }
        self.searcher = Some(searcher);

        println!("{}", bestmove_line(done.result.as_ref(), &done.position));
    }
}

impl Default for UciEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Record a `setoption` value.
    pub fn apply(&mut self, option: UciOption) {
        match option {
            UciOption::Hash(mb) => self.hash_mb = mb,
            UciOption::OwnBook(enabled) => self.own_book = enabled,
            UciOption::MoveOverhead(overhead) => self.move_overhead = overhead,
        }
    }
}

/// UCI score field: `cp N`, or `mate N` in moves when a mate is found.
pub fn format_score(score: i32) -> String {
    if score > MATE_THRESHOLD {
        format!("mate {}", (MATE_SCORE - score + 1) / 2)
    } else if score < -MATE_THRESHOLD {
        format!("mate -{}", (MATE_SCORE + score) / 2)
    } else {
        format!("cp {score}")
    }
}

/// One `info` line for an adopted iteration.
pub fn info_line(result: &SearchResult, nodes: u64, elapsed: Duration) -> String {
    let elapsed_ms = elapsed.as_millis().max(1);
    let nps = u128::from(nodes) * 1000 / elapsed_ms;
    format!(
        "info depth {} score {} nodes {} nps {} time {} pv {}",
        result.depth,
        format_score(result.score),
        nodes,
        nps,
        elapsed_ms,
        format_pv(&result.pv)
    )
}

/// The `bestmove` reply.
///
/// Without a search result the first legal move is played, and `0000` when
/// there is none.
pub fn bestmove_line(result: Option<&SearchResult>, position: &Position) -> String {
    let best = result.and_then(|r| r.best_move).or_else(|| first_legal(position));
    match (best, result.and_then(SearchResult::ponder_move)) {
        (Some(mv), Some(ponder)) => format!("bestmove {mv} ponder {ponder}"),
        (Some(mv), None) => format!("bestmove {mv}"),
        (None, _) => "bestmove 0000".to_string(),
    }
}

fn first_legal(position: &Position) -> Option<ChessMove> {
    let mut scratch = position.clone();
    position
        .pseudo_legal_moves()
        .into_iter()
        .find(|&mv| scratch.play(mv).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(score: i32, pv: &[&str], pos: &Position) -> SearchResult {
        let pv: Vec<ChessMove> = pv.iter().map(|m| pos.parse_move(m).unwrap()).collect();
        SearchResult {
            score,
            best_move: pv.first().copied(),
            pv,
            depth: 3,
            nodes: 0,
        }
    }

    #[test]
    fn config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.hash_mb, 64);
        assert!(config.own_book);
        assert_eq!(config.move_overhead, Duration::ZERO);
    }

    #[test]
    fn config_applies_options() {
        let mut config = EngineConfig::default();
        config.apply(UciOption::Hash(16));
        config.apply(UciOption::OwnBook(false));
        config.apply(UciOption::MoveOverhead(Duration::from_millis(50)));
        assert_eq!(config.hash_mb, 16);
        assert!(!config.own_book);
        assert_eq!(config.move_overhead, Duration::from_millis(50));
    }

    #[test]
    fn setoption_hash_resizes_idle_searcher() {
        let mut engine = UciEngine::new();
        engine.handle_setoption(UciOption::Hash(1));
        assert_eq!(engine.config().hash_mb, 1);
        assert!(engine.pending_resize_tt.is_none());
    }

    #[test]
    fn score_formatting() {
        assert_eq!(format_score(35), "cp 35");
        assert_eq!(format_score(-120), "cp -120");
        assert_eq!(format_score(MATE_SCORE - 1), "mate 1");
        assert_eq!(format_score(MATE_SCORE - 3), "mate 2");
        assert_eq!(format_score(-MATE_SCORE + 2), "mate -1");
    }

    #[test]
    fn bestmove_with_ponder() {
        let pos = Position::startpos();
        let r = result(20, &["e2e4"], &pos);
        assert_eq!(bestmove_line(Some(&r), &pos), "bestmove e2e4");

        let mut r = r;
        r.pv.push(ChessMove::new(
            kingbob_core::Square::E7,
            kingbob_core::Square::E5,
            None,
        ));
        assert_eq!(bestmove_line(Some(&r), &pos), "bestmove e2e4 ponder e7e5");
    }

    #[test]
    fn bestmove_falls_back_to_a_legal_move() {
        let pos = Position::startpos();
        let line = bestmove_line(None, &pos);
        let mv = line.strip_prefix("bestmove ").unwrap();
        assert!(pos.parse_move(mv).is_ok(), "{line}");
    }

    #[test]
    fn bestmove_without_legal_moves_is_null() {
        let pos = Position::from_fen("7k/6Q1/5K2/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(bestmove_line(None, &pos), "bestmove 0000");
    }

    #[test]
    fn info_line_reports_depth_score_and_pv() {
        let pos = Position::startpos();
        let r = result(12, &["d2d4"], &pos);
        let line = info_line(&r, 5000, Duration::from_millis(500));
        assert_eq!(line, "info depth 3 score cp 12 nodes 5000 nps 10000 time 500 pv d2d4");
    }
}
