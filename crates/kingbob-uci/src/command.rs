//! UCI command parsing.

use std::time::Duration;

use kingbob_core::Position;
use kingbob_engine::GoLimits;

use crate::error::UciError;

/// Largest accepted `Hash` value in megabytes.
pub const MAX_HASH_MB: usize = 4096;

/// Largest accepted `Move Overhead` value in milliseconds.
pub const MAX_MOVE_OVERHEAD_MS: u64 = 5000;

/// Parameters for the `go` command.
///
/// All fields are optional; a bare `go` uses defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    /// White's remaining time.
    pub wtime: Option<Duration>,
    /// Black's remaining time.
    pub btime: Option<Duration>,
    /// White's increment per move.
    pub winc: Option<Duration>,
    /// Black's increment per move.
    pub binc: Option<Duration>,
    /// Moves until next time control.
    pub movestogo: Option<u32>,
    /// Search to this depth only.
    pub depth: Option<i32>,
    /// Search for exactly this duration.
    pub movetime: Option<Duration>,
    /// Search until `stop` (no time limit).
    pub infinite: bool,
}

impl GoParams {
    /// The clock part of the command, for the time manager.
    pub fn limits(&self) -> GoLimits {
        GoLimits {
            wtime: self.wtime,
            btime: self.btime,
            winc: self.winc,
            binc: self.binc,
            movestogo: self.movestogo,
            movetime: self.movetime,
            infinite: self.infinite,
        }
    }
}

/// An option set through `setoption`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UciOption {
    /// Transposition table size in megabytes.
    Hash(usize),
    /// Whether to play from the built-in opening book.
    OwnBook(bool),
    /// Time kept in reserve on every move.
    MoveOverhead(Duration),
}

/// A parsed UCI command.
#[derive(Debug)]
pub enum Command {
    /// `uci` -- identify the engine.
    Uci,
    /// `isready` -- synchronization ping.
    IsReady,
    /// `ucinewgame` -- reset engine state.
    UciNewGame,
    /// `setoption name <name> value <value>`.
    SetOption(UciOption),
    /// `position` -- set up a position with optional moves applied.
    Position(Box<Position>),
    /// `go` -- start searching with given parameters.
    Go(GoParams),
    /// `stop` -- halt the current search.
    Stop,
    /// `quit` -- exit the engine.
    Quit,
    /// `d` -- print the current position.
    Display,
    /// Unrecognized command (silently ignored).
    Unknown(String),
}

/// Parse a single line of UCI input into a [`Command`].
pub fn parse_command(line: &str) -> Result<Command, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = tokens.split_first() else {
        return Ok(Command::Unknown(String::new()));
    };

    match head {
        "uci" => Ok(Command::Uci),
        "isready" => Ok(Command::IsReady),
        "ucinewgame" => Ok(Command::UciNewGame),
        "setoption" => parse_setoption(args),
        "stop" => Ok(Command::Stop),
        "quit" => Ok(Command::Quit),
        "d" => Ok(Command::Display),
        "position" => parse_position(args),
        "go" => parse_go(args),
        _ => Ok(Command::Unknown(head.to_string())),
    }
}

/// Parse the `position` command arguments.
///
/// Supports:
/// - `position startpos [moves e2e4 d7d5 ...]`
/// - `position fen <fen-string> [moves e2e4 d7d5 ...]`
///
/// The FEN runs up to the `moves` keyword, so 4-field FENs are accepted.
fn parse_position(tokens: &[&str]) -> Result<Command, UciError> {
    let Some((&kind, rest)) = tokens.split_first() else {
        return Err(UciError::MalformedPosition);
    };

    let moves_at = rest.iter().position(|&t| t == "moves").unwrap_or(rest.len());
    let (setup, moves) = rest.split_at(moves_at);

    let mut position = match kind {
        "startpos" => Position::startpos(),
        "fen" => {
            let fen = setup.join(" ");
            Position::from_fen(&fen).map_err(|source| UciError::InvalidFen { fen, source })?
        }
        _ => return Err(UciError::MalformedPosition),
    };

    for &uci_move in moves.iter().skip(1) {
        let mv = position
            .parse_move(uci_move)
            .map_err(|source| UciError::InvalidMove {
                uci_move: uci_move.to_string(),
                source,
            })?;
        position.make_move(mv);
    }

    Ok(Command::Position(Box::new(position)))
}

/// Parse the `go` command arguments.
///
/// Supports: wtime, btime, winc, binc, movestogo, depth, movetime,
/// infinite. Unknown tokens are silently skipped.
fn parse_go(tokens: &[&str]) -> Result<Command, UciError> {
    let mut params = GoParams::default();

    let mut i = 0;
    while i < tokens.len() {
        let value = tokens.get(i + 1);
        match tokens[i] {
            "wtime" => params.wtime = Some(parse_millis(value, "wtime")?),
            "btime" => params.btime = Some(parse_millis(value, "btime")?),
            "winc" => params.winc = Some(parse_millis(value, "winc")?),
            "binc" => params.binc = Some(parse_millis(value, "binc")?),
            "movestogo" => params.movestogo = Some(parse_int(value, "movestogo")?),
            "depth" => params.depth = Some(parse_int(value, "depth")?),
            "movetime" => params.movetime = Some(parse_millis(value, "movetime")?),
            "infinite" => {
                params.infinite = true;
                i += 1;
                continue;
            }
            _ => {
                i += 1;
                continue;
            }
        }
        i += 2;
    }

    Ok(Command::Go(params))
}

/// Parse `setoption name <name...> value <value>`.
///
/// Option names are matched case-insensitively and may contain spaces.
fn parse_setoption(tokens: &[&str]) -> Result<Command, UciError> {
    let name_at = tokens
        .iter()
        .position(|&t| t == "name")
        .ok_or_else(|| UciError::MissingValue {
            param: "name".to_string(),
        })?;
    let value_at = tokens.iter().position(|&t| t == "value");

    let name_end = value_at.unwrap_or(tokens.len());
    let name = tokens
        .get(name_at + 1..name_end)
        .unwrap_or_default()
        .join(" ");
    let value = value_at.and_then(|at| tokens.get(at + 1));

    let option = match name.to_ascii_lowercase().as_str() {
        "hash" => {
            let mb: usize = parse_int(value, "Hash")?;
            if !(1..=MAX_HASH_MB).contains(&mb) {
                return Err(invalid("Hash", mb));
            }
            UciOption::Hash(mb)
        }
        "ownbook" => {
            let text = value.ok_or_else(|| UciError::MissingValue {
                param: "OwnBook".to_string(),
            })?;
            match text.to_ascii_lowercase().as_str() {
                "true" => UciOption::OwnBook(true),
                "false" => UciOption::OwnBook(false),
                _ => return Err(invalid("OwnBook", text)),
            }
        }
        "move overhead" => {
            let ms: u64 = parse_int(value, "Move Overhead")?;
            if ms > MAX_MOVE_OVERHEAD_MS {
                return Err(invalid("Move Overhead", ms));
            }
            UciOption::MoveOverhead(Duration::from_millis(ms))
        }
        _ => return Err(UciError::UnknownOption { name }),
    };

    Ok(Command::SetOption(option))
}

fn invalid(param: &str, value: impl ToString) -> UciError {
    UciError::InvalidValue {
        param: param.to_string(),
        value: value.to_string(),
    }
}

/// Parse a millisecond value from a token.
///
/// GUIs occasionally send negative clocks when flagging; those clamp to zero.
fn parse_millis(token: Option<&&str>, param: &str) -> Result<Duration, UciError> {
    let ms: i64 = parse_int(token, param)?;
    Ok(Duration::from_millis(ms.max(0) as u64))
}

/// Parse an integer value from a token.
fn parse_int<T: std::str::FromStr>(token: Option<&&str>, param: &str) -> Result<T, UciError> {
    let value = token.ok_or_else(|| UciError::MissingValue {
        param: param.to_string(),
    })?;
    value.parse().map_err(|_| invalid(param, value))
}
