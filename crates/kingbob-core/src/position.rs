//! A chess position with make/unmake, repetition history and draw rules.
//!
//! [`chess::Board`] is an immutable copy-make board: it knows piece placement,
//! castling rights, en passant and the Zobrist key, but nothing about the game
//! that led to it. [`Position`] layers the game state on top of it:
//!
//! - an undo stack so the search can mutate one position in place,
//! - the halfmove clock and fullmove number from the FEN,
//! - a hash history used for repetition detection.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use chess::{BitBoard, Board, BoardStatus, ChessMove, Color, MoveGen, Piece, Square};

use crate::error::PositionError;

/// FEN of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Halfmove clock value at which the fifty-move rule applies.
const FIFTY_MOVE_PLIES: u32 = 100;

/// State needed to take back one move.
#[derive(Clone, Copy)]
struct Undo {
    board: Board,
    halfmove_clock: u32,
    fullmove_number: u32,
    reversible_plies: u32,
}

/// A mutable chess position.
///
/// Moves are applied with [`make_move`](Self::make_move) and taken back with
/// [`unmake_move`](Self::unmake_move). Every successful make pushes exactly one
/// undo record, so any sequence of makes followed by the same number of
/// unmakes restores the position bit for bit, hash history included.
#[derive(Clone)]
pub struct Position {
    board: Board,
    halfmove_clock: u32,
    fullmove_number: u32,
    /// Plies since the last capture, pawn move or null move. Bounds the
    /// repetition scan.
    reversible_plies: u32,
    /// Zobrist keys of every position reached, the current one last.
    hashes: Vec<u64>,
    undo: Vec<Undo>,
}

impl Position {
    /// The standard starting position.
    pub fn startpos() -> Self {
        Self::from_board(Board::default(), 0, 1)
    }

    /// Parse a position from FEN.
    ///
    /// The piece placement, side to move, castling and en passant fields are
    /// required. The halfmove clock and fullmove number default to `0` and `1`
    /// when absent.
    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(PositionError::InvalidFen {
                fen: fen.to_string(),
                reason: format!("expected at least 4 fields, found {}", fields.len()),
            });
        }

        let halfmove_clock = parse_counter(fields.get(4), "halfmove clock", 0)?;
        let fullmove_number = parse_counter(fields.get(5), "fullmove number", 1)?.max(1);

        let normalized = format!(
            "{} {} {}",
            fields[..4].join(" "),
            halfmove_clock,
            fullmove_number
        );
        let board = Board::from_str(&normalized).map_err(|err| PositionError::InvalidFen {
            fen: fen.to_string(),
            reason: err.to_string(),
        })?;

        Ok(Self::from_board(board, halfmove_clock, fullmove_number))
    }

    fn from_board(board: Board, halfmove_clock: u32, fullmove_number: u32) -> Self {
        Self {
            board,
            halfmove_clock,
            fullmove_number,
            reversible_plies: halfmove_clock,
            hashes: vec![board.get_hash()],
            undo: Vec::new(),
        }
    }

    /// Serialize to a standard 6-field FEN string.
    pub fn to_fen(&self) -> String {
        let board_fen = self.board.to_string();
        let head: Vec<&str> = board_fen.split_whitespace().take(4).collect();
        format!(
            "{} {} {}",
            head.join(" "),
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    /// The underlying board.
    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Zobrist key of the current position.
    #[inline]
    pub fn hash(&self) -> u64 {
        self.board.get_hash()
    }

    /// The side to move.
    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    /// The piece and its color on `sq`, if any.
    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<(Piece, Color)> {
        self.board.piece_on(sq).zip(self.board.color_on(sq))
    }

    /// Plies since the last capture or pawn move.
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    /// The fullmove number, starting at 1 and incremented after Black moves.
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// Candidate moves for the side to move.
    ///
    /// The underlying generator only produces legal moves, so every move here
    /// will be accepted by [`make_move`](Self::make_move). Callers still apply
    /// moves through `make_move` and honour its result.
    pub fn pseudo_legal_moves(&self) -> Vec<ChessMove> {
        MoveGen::new_legal(&self.board).collect()
    }

    /// Candidate captures for the side to move, en passant included.
    pub fn captures(&self) -> Vec<ChessMove> {
        let mut movegen = MoveGen::new_legal(&self.board);
        movegen.set_iterator_mask(*self.board.color_combined(!self.side_to_move()));
        let mut captures: Vec<ChessMove> = movegen.by_ref().collect();

        if self.board.en_passant().is_some() {
            movegen.set_iterator_mask(!BitBoard::new(0));
            captures.extend(movegen.filter(|&mv| self.is_en_passant(mv)));
        }
        captures
    }

    /// Whether `mv` removes an enemy piece from the board.
    pub fn is_capture(&self, mv: ChessMove) -> bool {
        self.board.piece_on(mv.get_dest()).is_some() || self.is_en_passant(mv)
    }

    /// The kind of piece `mv` captures, if any.
    pub fn captured_piece(&self, mv: ChessMove) -> Option<Piece> {
        match self.board.piece_on(mv.get_dest()) {
            Some(piece) => Some(piece),
            None if self.is_en_passant(mv) => Some(Piece::Pawn),
            None => None,
        }
    }

    /// A pawn moving diagonally onto an empty square.
    fn is_en_passant(&self, mv: ChessMove) -> bool {
        self.board.piece_on(mv.get_source()) == Some(Piece::Pawn)
            && mv.get_source().get_file() != mv.get_dest().get_file()
            && self.board.piece_on(mv.get_dest()).is_none()
    }

    /// Apply `mv` in place.
    ///
    /// Returns `false` and leaves the position untouched if the move is not
    /// legal here.
    pub fn make_move(&mut self, mv: ChessMove) -> bool {
        if !self.board.legal(mv) {
            return false;
        }

        let zeroing =
            self.is_capture(mv) || self.board.piece_on(mv.get_source()) == Some(Piece::Pawn);
        let mover = self.side_to_move();

        self.undo.push(self.snapshot());
        self.board = self.board.make_move_new(mv);

        if zeroing {
            self.halfmove_clock = 0;
            self.reversible_plies = 0;
        } else {
            self.halfmove_clock += 1;
            self.reversible_plies += 1;
        }
        if mover == Color::Black {
            self.fullmove_number += 1;
        }
        self.hashes.push(self.board.get_hash());
        true
    }

    /// Pass the turn to the opponent.
    ///
    /// Returns `false` when the side to move is in check. Taken back with
    /// [`unmake_move`](Self::unmake_move). A null move closes the repetition
    /// window: positions before it are never counted as repeats.
    pub fn make_null_move(&mut self) -> bool {
        let Some(next) = self.board.null_move() else {
            return false;
        };
        let mover = self.side_to_move();

        self.undo.push(self.snapshot());
        self.board = next;
        self.halfmove_clock += 1;
        self.reversible_plies = 0;
        if mover == Color::Black {
            self.fullmove_number += 1;
        }
        self.hashes.push(self.board.get_hash());
        true
    }

    /// Take back the last move or null move. Does nothing at the game root.
    pub fn unmake_move(&mut self) {
        let Some(prev) = self.undo.pop() else {
            return;
        };
        self.board = prev.board;
        self.halfmove_clock = prev.halfmove_clock;
        self.fullmove_number = prev.fullmove_number;
        self.reversible_plies = prev.reversible_plies;
        self.hashes.pop();
    }

    fn snapshot(&self) -> Undo {
        Undo {
            board: self.board,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
            reversible_plies: self.reversible_plies,
        }
    }

    /// Apply `mv` and return a guard that takes it back when dropped.
    ///
    /// Returns `None` if the move is illegal. The guard derefs to the
    /// position, so it can be handed straight to a recursive search.
    pub fn play(&mut self, mv: ChessMove) -> Option<MoveGuard<'_>> {
        if self.make_move(mv) {
            Some(MoveGuard { position: self })
        } else {
            None
        }
    }

    /// Null-move counterpart of [`play`](Self::play).
    pub fn play_null(&mut self) -> Option<MoveGuard<'_>> {
        if self.make_null_move() {
            Some(MoveGuard { position: self })
        } else {
            None
        }
    }

    /// Whether the side to move is in check.
    #[inline]
    pub fn in_check(&self) -> bool {
        self.board.checkers().popcnt() > 0
    }

    /// Whether the side to move has at least one legal move.
    pub fn has_legal_moves(&self) -> bool {
        MoveGen::new_legal(&self.board).len() > 0
    }

    /// Whether the side to move is checkmated.
    pub fn is_mated(&self) -> bool {
        self.board.status() == BoardStatus::Checkmate
    }

    /// Whether the side to move has no legal move and is not in check.
    pub fn is_stalemate(&self) -> bool {
        self.board.status() == BoardStatus::Stalemate
    }

    /// Whether the current position already occurred at least `count` times
    /// earlier with the same side to move.
    ///
    /// `is_repetition(1)` is a twofold repetition, `is_repetition(2)` a
    /// threefold one. Only the positions since the last irreversible move are
    /// scanned.
    pub fn is_repetition(&self, count: usize) -> bool {
        let current = self.hash();
        let window = self.reversible_plies as usize;
        let seen = self
            .hashes
            .iter()
            .rev()
            .take(window + 1)
            .skip(2)
            .step_by(2)
            .filter(|&&hash| hash == current)
            .count();
        seen >= count
    }

    /// Neither side can possibly mate: bare kings, or a single minor piece.
    pub fn is_insufficient_material(&self) -> bool {
        let board = &self.board;
        let blockers =
            *board.pieces(Piece::Pawn) | *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);
        if blockers.popcnt() > 0 {
            return false;
        }
        let minors = *board.pieces(Piece::Knight) | *board.pieces(Piece::Bishop);
        minors.popcnt() <= 1
    }

    /// Draw by rule: fifty-move rule, insufficient material or threefold
    /// repetition.
    pub fn is_draw(&self) -> bool {
        self.halfmove_clock >= FIFTY_MOVE_PLIES
            || self.is_insufficient_material()
            || self.is_repetition(2)
    }

    /// Whether `color` owns a knight, bishop, rook or queen.
    pub fn has_non_pawn_material(&self, color: Color) -> bool {
        let board = &self.board;
        let pieces = *board.pieces(Piece::Knight)
            | *board.pieces(Piece::Bishop)
            | *board.pieces(Piece::Rook)
            | *board.pieces(Piece::Queen);
        (pieces & *board.color_combined(color)).popcnt() > 0
    }

    /// Resolve a long-algebraic move (`e2e4`, `e7e8q`) against the legal
    /// moves of this position.
    pub fn parse_move(&self, uci_move: &str) -> Result<ChessMove, PositionError> {
        MoveGen::new_legal(&self.board)
            .find(|mv| mv.to_string() == uci_move)
            .ok_or_else(|| PositionError::IllegalMove {
                uci_move: uci_move.to_string(),
                fen: self.to_fen(),
            })
    }
}

fn parse_counter(
    field: Option<&&str>,
    name: &'static str,
    default: u32,
) -> Result<u32, PositionError> {
    match field {
        None => Ok(default),
        Some(text) => text.parse().map_err(|_| PositionError::InvalidMoveCounter {
            field: name,
            found: text.to_string(),
        }),
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl FromStr for Position {
    type Err = PositionError;

    fn from_str(fen: &str) -> Result<Self, Self::Err> {
        Self::from_fen(fen)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fen())
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position")
            .field("fen", &self.to_fen())
            .field("depth", &self.undo.len())
            .finish()
    }
}

/// A move applied to a [`Position`], taken back when the guard is dropped.
///
/// Created by [`Position::play`] and [`Position::play_null`].
pub struct MoveGuard<'a> {
    position: &'a mut Position,
}

impl Deref for MoveGuard<'_> {
    type Target = Position;

    fn deref(&self) -> &Position {
        self.position
    }
}

impl DerefMut for MoveGuard<'_> {
    fn deref_mut(&mut self) -> &mut Position {
        self.position
    }
}

impl Drop for MoveGuard<'_> {
    fn drop(&mut self) {
        self.position.unmake_move();
    }
}
