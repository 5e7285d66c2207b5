//! Middlegame/endgame score pairs used by the tapered evaluation.

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use crate::eval::phase::{GamePhase, MAX_PHASE};

/// A middlegame and an endgame value, blended by [`Score::taper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Score {
    pub mg: i32,
    pub eg: i32,
}

impl Score {
    /// Zero score (mg=0, eg=0).
    pub const ZERO: Score = Score { mg: 0, eg: 0 };

    /// Construct a `Score` from separate middlegame and endgame values.
    #[inline]
    pub const fn new(mg: i32, eg: i32) -> Score {
        Score { mg, eg }
    }

    /// Interpolate between the two halves by game phase.
    ///
    /// Computes `(mg * midgame + eg * endgame) / 24`. Division truncates toward
    /// zero, so `(-s).taper(p) == -(s.taper(p))`.
    #[inline]
    pub fn taper(self, phase: GamePhase) -> i32 {
        (self.mg * phase.midgame + self.eg * phase.endgame) / MAX_PHASE
    }
}

/// Shorthand constructor for a [`Score`], used by the evaluation tables.
#[allow(non_snake_case)]
#[inline]
pub const fn S(mg: i32, eg: i32) -> Score {
    Score::new(mg, eg)
}

impl Add for Score {
    type Output = Score;

    #[inline]
    fn add(self, rhs: Score) -> Score {
        Score::new(self.mg + rhs.mg, self.eg + rhs.eg)
    }
}

impl AddAssign for Score {
    #[inline]
    fn add_assign(&mut self, rhs: Score) {
        *self = *self + rhs;
    }
}

impl Sub for Score {
    type Output = Score;

    #[inline]
    fn sub(self, rhs: Score) -> Score {
        Score::new(self.mg - rhs.mg, self.eg - rhs.eg)
    }
}

impl SubAssign for Score {
    #[inline]
    fn sub_assign(&mut self, rhs: Score) {
        *self = *self - rhs;
    }
}

impl Neg for Score {
    type Output = Score;

    #[inline]
    fn neg(self) -> Score {
        Score::new(-self.mg, -self.eg)
    }
}
