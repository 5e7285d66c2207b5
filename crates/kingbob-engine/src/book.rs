//! Small built-in opening book keyed by Zobrist hash.

use std::collections::HashMap;

use kingbob_core::{ChessMove, Position};
use tracing::warn;

/// Main lines replayed from the starting position to fill the book. Earlier
/// lines take priority when they share a position.
const LINES: &[&str] = &[
    // Ruy Lopez
    "e2e4 e7e5 g1f3 b8c6 f1b5 a7a6 b5a4 g8f6 e1g1 f8e7",
    // Italian
    "e2e4 e7e5 g1f3 b8c6 f1c4 f8c5 c2c3 g8f6 d2d4 e5d4",
    // Sicilian Najdorf
    "e2e4 c7c5 g1f3 d7d6 d2d4 c5d4 f3d4 g8f6 b1c3 a7a6",
    // French
    "e2e4 e7e6 d2d4 d7d5 b1c3 g8f6 c1g5 f8e7",
    // Caro-Kann
    "e2e4 c7c6 d2d4 d7d5 b1c3 d5e4 c3e4 c8f5",
    // Queen's Gambit Declined
    "d2d4 d7d5 c2c4 e7e6 b1c3 g8f6 c1g5 f8e7",
    // King's Indian
    "d2d4 g8f6 c2c4 g7g6 b1c3 f8g7 e2e4 d7d6",
    // English
    "c2c4 e7e5 b1c3 g8f6 g1f3 b8c6",
];

/// Opening book: position hash to candidate replies, best first.
#[derive(Debug, Clone, Default)]
pub struct OpeningBook {
    entries: HashMap<u64, Vec<ChessMove>>,
}

impl OpeningBook {
    /// The built-in book.
    pub fn standard() -> Self {
        Self::from_lines(LINES)
    }

    /// Build a book by replaying each line of UCI moves from the starting
    /// position. A line stops at its first unplayable move.
    pub fn from_lines(lines: &[&str]) -> Self {
        let mut entries: HashMap<u64, Vec<ChessMove>> = HashMap::new();

        for line in lines {
            let mut pos = Position::startpos();
            for uci in line.split_whitespace() {
                let mv = match pos.parse_move(uci) {
                    Ok(mv) => mv,
                    Err(err) => {
                        warn!(%err, line, "skipping rest of book line");
                        break;
                    }
                };
                let replies = entries.entry(pos.hash()).or_default();
                if !replies.contains(&mv) {
                    replies.push(mv);
                }
                pos.make_move(mv);
            }
        }

        Self { entries }
    }

    /// First book reply that is legal in `pos`, if the position is known.
    pub fn probe(&self, pos: &Position) -> Option<ChessMove> {
        self.entries
            .get(&pos.hash())?
            .iter()
            .copied()
            .find(|&mv| pos.board().legal(mv))
    }

    /// Number of positions in the book.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the book holds no positions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
