//! Transposition table: a power-of-two array of cached search results.
//!
//! Slots are addressed by `key & (capacity - 1)`. A slot holds at most one
//! entry and the full 64-bit key is kept for verification on lookup.
//!
//! ## Replacement
//!
//! A store always overwrites a slot holding a different position. For the
//! same position it overwrites only when the new search is at least as deep.
//!
//! ## Load factor
//!
//! Every write bumps a counter, overwrites included, so [`load_factor`]
//! over-estimates true occupancy. The search clears the table once the
//! counter reaches the slot count.
//!
//! [`load_factor`]: TranspositionTable::load_factor

use kingbob_core::ChessMove;

use crate::search::negamax::MATE_THRESHOLD;

/// Bound type stored in a TT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// The stored score is exact (PV node).
    Exact,
    /// The stored score is a lower bound (failed high / beta cutoff).
    LowerBound,
    /// The stored score is an upper bound (failed low / all-node).
    UpperBound,
}

/// A cached search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtEntry {
    /// Full Zobrist key of the position.
    pub key: u64,
    /// Remaining depth the position was searched to.
    pub depth: i32,
    /// Score in TT form (see [`value_to_tt`]).
    pub value: i32,
    pub bound: Bound,
    pub best_move: Option<ChessMove>,
    /// Principal variation from this position, starting with `best_move`.
    pub pv: Option<Vec<ChessMove>>,
}

/// Convert a search score to TT-storable form.
///
/// Mate scores are path-dependent: `MATE_SCORE - ply` changes based on
/// the search path. We store them as distance-from-node instead of
/// distance-from-root so they're path-independent.
pub fn value_to_tt(score: i32, ply: usize) -> i32 {
    if score > MATE_THRESHOLD {
        score + ply as i32
    } else if score < -MATE_THRESHOLD {
        score - ply as i32
    } else {
        score
    }
}

/// Reverse of [`value_to_tt`].
pub fn value_from_tt(score: i32, ply: usize) -> i32 {
    if score > MATE_THRESHOLD {
        score - ply as i32
    } else if score < -MATE_THRESHOLD {
        score + ply as i32
    } else {
        score
    }
}

/// Fixed-capacity transposition table.
pub struct TranspositionTable {
    slots: Box<[Option<TtEntry>]>,
    /// Index mask: `capacity - 1`.
    mask: u64,
    /// Number of writes since the last clear.
    writes: usize,
}

impl TranspositionTable {
    /// Create a table using at most `mb` megabytes of slot storage.
    ///
    /// The slot count is rounded down to a power of two, with a minimum of one
    /// slot. Principal variations are heap allocations on top of this budget.
    pub fn new(mb: usize) -> Self {
        let bytes = mb.max(1) * 1024 * 1024;
        let slot_size = std::mem::size_of::<Option<TtEntry>>();
        let wanted = (bytes / slot_size).max(1);
        let capacity = 1usize << (usize::BITS - 1 - wanted.leading_zeros());

        Self {
            slots: vec![None; capacity].into_boxed_slice(),
            mask: (capacity - 1) as u64,
            writes: 0,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Fetch the entry for `key`, if its slot currently holds that position.
    pub fn get(&self, key: u64) -> Option<&TtEntry> {
        self.slots[self.index(key)]
            .as_ref()
            .filter(|entry| entry.key == key)
    }

    /// Store a search result, subject to the replacement policy.
    pub fn store(
        &mut self,
        key: u64,
        depth: i32,
        value: i32,
        bound: Bound,
        best_move: Option<ChessMove>,
        pv: Option<Vec<ChessMove>>,
    ) {
        let index = self.index(key);
        let replace = match &self.slots[index] {
            None => true,
            Some(existing) => existing.key != key || depth >= existing.depth,
        };
        if !replace {
            return;
        }

        self.slots[index] = Some(TtEntry {
            key,
            depth,
            value,
            bound,
            best_move,
            pv,
        });
        self.writes += 1;
    }

    /// Remove every entry and reset the write counter.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.writes = 0;
    }

    /// Writes since the last clear divided by the slot count.
    pub fn load_factor(&self) -> f64 {
        self.writes as f64 / self.slots.len() as f64
    }

    #[inline]
    fn index(&self, key: u64) -> usize {
        (key & self.mask) as usize
    }
}

impl std::fmt::Debug for TranspositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspositionTable")
            .field("capacity", &self.slots.len())
            .field("writes", &self.writes)
            .finish()
    }
}
