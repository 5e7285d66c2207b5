//! Killer move table for quiet move ordering.

use kingbob_core::ChessMove;

use crate::search::negamax::MAX_PLY;

/// Two killer moves per ply: quiet moves that caused beta cutoffs.
///
/// Lives for one `think` call and is shared by every depth of the
/// iterative-deepening loop.
pub struct KillerTable {
    slots: [[Option<ChessMove>; 2]; MAX_PLY],
}

impl KillerTable {
    /// Create an empty killer table.
    pub fn new() -> Self {
        Self {
            slots: [[None; 2]; MAX_PLY],
        }
    }

    /// Record a quiet move that caused a cutoff at `ply`.
    ///
    /// Slot 0 moves to slot 1 and the new move takes slot 0. Storing the move
    /// already in slot 0 changes nothing.
    pub fn store(&mut self, ply: usize, mv: ChessMove) {
        let Some(slots) = self.slots.get_mut(ply) else {
            return;
        };
        if slots[0] != Some(mv) {
            slots[1] = slots[0];
            slots[0] = Some(mv);
        }
    }

    /// Both killers at `ply`, slot 0 first.
    pub fn at(&self, ply: usize) -> [Option<ChessMove>; 2] {
        self.slots.get(ply).copied().unwrap_or([None; 2])
    }
}

impl Default for KillerTable {
    fn default() -> Self {
        Self::new()
    }
}
