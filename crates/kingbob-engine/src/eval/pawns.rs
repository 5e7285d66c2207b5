//! Passed pawn evaluation.
//!
//! A pawn is passed when no enemy pawn stands in front of it on its own file
//! or on either adjacent file. Each file contributes at most once, through its
//! most advanced pawn, with a reward proportional to how far that pawn has
//! travelled. Scores are from White's perspective.

use kingbob_core::{Board, Color, Piece};

/// Reward per rank for a passed pawn, counted from the pawn's own back rank.
const PASSED_PAWN_REWARD: i32 = 10;

const FILE_A: u64 = 0x0101_0101_0101_0101;

/// For each `[color][square]`, the squares ahead of a pawn on the same file
/// and on adjacent files.
///
/// A pawn is passed if `PASSED_PAWN_MASK[color][sq] & enemy_pawns` is empty.
static PASSED_PAWN_MASK: [[u64; 64]; 2] = compute_passed_pawn_masks();

const fn compute_passed_pawn_masks() -> [[u64; 64]; 2] {
    let mut table = [[0u64; 64]; 2];

    let mut sq = 0usize;
    while sq < 64 {
        let rank = sq / 8;
        let file = sq % 8;

        let mut span = FILE_A << file;
        if file > 0 {
            span |= FILE_A << (file - 1);
        }
        if file < 7 {
            span |= FILE_A << (file + 1);
        }

        // White: ranks above; Black: ranks below.
        let above = if rank == 7 { 0 } else { u64::MAX << ((rank + 1) * 8) };
        let below = if rank == 0 { 0 } else { u64::MAX >> ((8 - rank) * 8) };

        table[0][sq] = span & above;
        table[1][sq] = span & below;
        sq += 1;
    }

    table
}

/// Passed pawn balance from White's perspective.
pub fn passed_pawns(board: &Board) -> i32 {
    let pawns = *board.pieces(Piece::Pawn);
    let white = (pawns & *board.color_combined(Color::White)).0;
    let black = (pawns & *board.color_combined(Color::Black)).0;

    passed_for_side(white, black, Color::White) - passed_for_side(black, white, Color::Black)
}

fn passed_for_side(own: u64, enemy: u64, color: Color) -> i32 {
    let mut total = 0;
    for file in 0..8 {
        let on_file = own & (FILE_A << file);
        if on_file == 0 {
            continue;
        }

        // Most advanced pawn on the file.
        let sq = match color {
            Color::White => 63 - on_file.leading_zeros() as usize,
            Color::Black => on_file.trailing_zeros() as usize,
        };
        if PASSED_PAWN_MASK[color.to_index()][sq] & enemy != 0 {
            continue;
        }

        let relative_rank = match color {
            Color::White => sq / 8 + 1,
            Color::Black => 8 - sq / 8,
        };
        total += PASSED_PAWN_REWARD * relative_rank as i32;
    }
    total
}

#[cfg(test)]
mod tests {
    use kingbob_core::Position;

    use super::{PASSED_PAWN_MASK, passed_pawns};

    fn passed(fen: &str) -> i32 {
        passed_pawns(Position::from_fen(fen).unwrap().board())
    }

    #[test]
    fn starting_position_has_no_passers() {
        assert_eq!(passed_pawns(Position::startpos().board()), 0);
    }

    #[test]
    fn lone_white_pawn_on_e5_is_passed() {
        // Rank 5 from White's back rank.
        assert_eq!(passed("4k3/8/8/4P3/8/8/8/4K3 w - - 0 1"), 50);
    }

    #[test]
    fn black_passer_counts_from_its_own_side() {
        // Black pawn on d3 is six ranks from Black's back rank.
        assert_eq!(passed("4k3/8/8/8/8/3p4/8/4K3 w - - 0 1"), -60);
    }

    #[test]
    fn adjacent_enemy_pawn_ahead_blocks() {
        // e5 and f7 stop each other.
        assert_eq!(passed("4k3/5p2/8/4P3/8/8/8/4K3 w - - 0 1"), 0);
    }

    #[test]
    fn enemy_pawn_behind_does_not_block() {
        // Black pawn on d3 is behind the e5 pawn; both are passed.
        assert_eq!(passed("4k3/8/8/4P3/8/3p4/8/4K3 w - - 0 1"), 50 - 60);
    }

    #[test]
    fn mask_spans_three_files_ahead() {
        // e4 for White: d5..f8.
        let e4 = 28;
        let mask = PASSED_PAWN_MASK[0][e4];
        assert_eq!(mask.count_ones(), 12);
        // a-file pawn only sees two files.
        assert_eq!(PASSED_PAWN_MASK[0][8].count_ones(), 12);
        assert_eq!(PASSED_PAWN_MASK[1][48].count_ones(), 12);
    }
}
