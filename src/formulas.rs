//! Perfect clear arithmetic on the 7-bag cycle.

/// Cells in a four line perfect clear divided by the cells of one piece.
pub const PC_SIZE: usize = 10;

/// Leftover length (1..=7) carried into the `pc_num`th perfect clear.
pub fn pc_num_to_leftover_len(pc_num: u8) -> usize {
    (pc_num as usize * 4 + 2) % 7 + 1
}

/// Perfect clear number (1..=7) that starts with `leftover_len` leftover pieces.
pub fn leftover_len_to_pc_num(leftover_len: usize) -> u8 {
    ((leftover_len * 2) % 7 + 1) as u8
}

/// Pieces drawn from each bag to reach `total` pieces, starting from the leftover.
///
/// `bag_composition(4, 11)` is `[4, 7]`, `bag_composition(1, 11)` is `[1, 7, 3]`.
pub fn bag_composition(leftover_len: usize, total: usize) -> Vec<usize> {
    let mut composition = vec![leftover_len];
    let mut sum = leftover_len;
    while sum < total {
        let next = (total - sum).min(7);
        composition.push(next);
        sum += next;
    }
    composition
}

/// Perfect clear number for a game that has placed `pieces` pieces onto a board already holding
/// `minos` minos. `minos` is assumed even.
pub fn pc_num(pieces: usize, minos: usize) -> u8 {
    let pieces_mod = (pieces % 7) as isize;
    let minos_to_pieces = (3 * (minos % 4) + 2 * (minos % 7)) as isize;
    let effective = (pieces_mod - minos_to_pieces).rem_euclid(7);
    ((5 * effective) % 7 + 1) as u8
}
