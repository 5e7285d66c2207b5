//! UCI protocol errors.

use kingbob_core::PositionError;

/// Errors that can occur during UCI protocol handling.
#[derive(Debug, thiserror::Error)]
pub enum UciError {
    /// The `position` command is missing `startpos` or `fen` keyword.
    #[error("malformed position command: missing startpos or fen keyword")]
    MalformedPosition,

    /// Failed to parse a FEN string.
    #[error("invalid FEN: {fen}")]
    InvalidFen {
        /// The FEN string that failed to parse.
        fen: String,
        #[source]
        source: PositionError,
    },

    /// A move in the `position` command is not legal in its position.
    #[error("invalid move: {uci_move}")]
    InvalidMove {
        /// The UCI move string that failed to parse.
        uci_move: String,
        #[source]
        source: PositionError,
    },

    /// A `go` or `setoption` parameter is missing its value.
    #[error("missing value for {param}")]
    MissingValue { param: String },

    /// A `go` or `setoption` value could not be parsed or is out of range.
    #[error("invalid value for {param}: {value}")]
    InvalidValue { param: String, value: String },

    /// `setoption` named an option the engine does not have.
    #[error("unknown option: {name}")]
    UnknownOption { name: String },

    /// An I/O error occurred while reading from stdin.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
