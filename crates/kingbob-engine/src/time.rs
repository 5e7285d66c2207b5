//! Time management: convert `go` clock parameters into a search deadline.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use kingbob_core::Color;

use crate::search::control::SearchManager;

/// Remaining time assumed for the side to move when the GUI omits it.
const DEFAULT_REMAINING_MS: u64 = 10_000;

/// Longest budget ever handed to a single search.
pub const MAX_BUDGET_MS: u64 = 20_000;

/// Clock parameters of a `go` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoLimits {
    pub wtime: Option<Duration>,
    pub btime: Option<Duration>,
    pub winc: Option<Duration>,
    pub binc: Option<Duration>,
    pub movestogo: Option<u32>,
    pub movetime: Option<Duration>,
    pub infinite: bool,
}

/// Divisor applied to the remaining clock, by bracket:
///
/// | Remaining      | Divisor |
/// |----------------|---------|
/// | > 300 s        | 50      |
/// | > 120 s        | 40      |
/// | > 60 s         | 30      |
/// | > 30 s         | 25      |
/// | otherwise      | 20      |
pub fn time_divisor(remaining_ms: u64) -> u64 {
    match remaining_ms {
        ms if ms > 300_000 => 50,
        ms if ms > 120_000 => 40,
        ms if ms > 60_000 => 30,
        ms if ms > 30_000 => 25,
        _ => 20,
    }
}

/// Wall-clock budget for one search, or `None` for no deadline.
///
/// Priority order:
/// 1. `infinite` -> `None`
/// 2. `movetime` -> that, minus `overhead`
/// 3. either clock present -> side's remaining time / [`time_divisor`],
///    minus `overhead`, capped at [`MAX_BUDGET_MS`]
/// 4. depth-only or bare `go` -> `None`
///
/// A budget is never below one millisecond.
pub fn search_budget(limits: &GoLimits, side: Color, overhead: Duration) -> Option<Duration> {
    if limits.infinite {
        return None;
    }

    let overhead_ms = overhead.as_millis() as u64;

    if let Some(movetime) = limits.movetime {
        let ms = (movetime.as_millis() as u64).saturating_sub(overhead_ms).max(1);
        return Some(Duration::from_millis(ms));
    }

    if limits.wtime.is_none() && limits.btime.is_none() {
        return None;
    }

    let remaining = match side {
        Color::White => limits.wtime,
        Color::Black => limits.btime,
    };
    let remaining_ms = remaining.map_or(DEFAULT_REMAINING_MS, |d| d.as_millis() as u64);

    let ms = (remaining_ms / time_divisor(remaining_ms))
        .saturating_sub(overhead_ms)
        .clamp(1, MAX_BUDGET_MS);
    Some(Duration::from_millis(ms))
}

/// Build a [`SearchManager`] from `go` parameters and the side to move.
pub fn manager_from_go(
    limits: &GoLimits,
    side: Color,
    overhead: Duration,
    stopped: Arc<AtomicBool>,
) -> SearchManager {
    match search_budget(limits, side, overhead) {
        Some(budget) => SearchManager::with_deadline(budget, stopped),
        None => SearchManager::infinite(stopped),
    }
}
