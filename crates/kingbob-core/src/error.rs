//! Error types for position setup and move parsing.

/// Errors raised while building or mutating a [`Position`](crate::Position)
/// from external input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    /// The FEN string could not be parsed into a valid board.
    #[error("invalid FEN \"{fen}\": {reason}")]
    InvalidFen {
        /// The FEN string that failed to parse.
        fen: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A move counter field is not a valid number.
    #[error("invalid {field} in FEN: \"{found}\"")]
    InvalidMoveCounter {
        /// The field name ("halfmove clock" or "fullmove number").
        field: &'static str,
        /// The invalid string.
        found: String,
    },

    /// A move string is not a legal move in the current position.
    #[error("illegal move {uci_move} in {fen}")]
    IllegalMove {
        /// The move as given, in long algebraic notation.
        uci_move: String,
        /// FEN of the position the move was tried in.
        fen: String,
    },
}
