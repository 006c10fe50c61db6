use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use itertools::Itertools;
use strum::VariantArray;

use crate::error::ParseError;

/// One of the seven tetrominoes, declared in rank order `TILJSZO`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, VariantArray, strum::Display)]
pub enum Piece {
    /// Rank 1.
    T,
    /// Rank 2.
    I,
    /// Rank 3.
    L,
    /// Rank 4.
    J,
    /// Rank 5.
    S,
    /// Rank 6.
    Z,
    /// Rank 7.
    O,
}

/// A full bag, in rank order.
pub const BAG: &[Piece] = Piece::VARIANTS;

impl Piece {
    /// Rank in the fixed `TILJSZO` order, starting at 1.
    pub fn rank(self) -> u8 {
        self as u8 + 1
    }

    /// The letter of the piece.
    pub fn to_char(self) -> char {
        match self {
            Self::T => 'T',
            Self::I => 'I',
            Self::L => 'L',
            Self::J => 'J',
            Self::S => 'S',
            Self::Z => 'Z',
            Self::O => 'O',
        }
    }

    /// The character code of the piece letter, used by the fumen checksum.
    pub fn char_code(self) -> u32 {
        self.to_char() as u32
    }

    /// Horizontal mirror image: L and J swap, S and Z swap.
    pub fn mirror(self) -> Self {
        match self {
            Self::L => Self::J,
            Self::J => Self::L,
            Self::S => Self::Z,
            Self::Z => Self::S,
            other => other,
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<char> for Piece {
    type Error = ParseError;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            'T' => Ok(Self::T),
            'I' => Ok(Self::I),
            'L' => Ok(Self::L),
            'J' => Ok(Self::J),
            'S' => Ok(Self::S),
            'Z' => Ok(Self::Z),
            'O' => Ok(Self::O),
            other => Err(ParseError::InvalidPiece(other)),
        }
    }
}

/// Per-piece occurrence counts, indexed by rank order.
pub type PieceCounts = [usize; 7];

/// An ordered sequence of pieces.
///
/// Order is significant for upcoming sequences; saves use the [`sorted`](Queue::sorted) form.
/// Queues compare the way their rank strings compare as decimal numbers: shorter queues first,
/// then piece by piece in rank order.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Queue(Vec<Piece>);

impl Queue {
    /// Wrap `pieces` as a queue.
    pub fn new(pieces: Vec<Piece>) -> Self {
        Self(pieces)
    }

    /// Pieces in queue order.
    pub fn pieces(&self) -> &[Piece] {
        &self.0
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pieces in queue order, by value.
    pub fn iter(&self) -> impl Iterator<Item = Piece> + '_ {
        self.0.iter().copied()
    }

    /// Whether `piece` occurs at least once.
    pub fn contains(&self, piece: Piece) -> bool {
        self.0.contains(&piece)
    }

    /// The same pieces in `TILJSZO` order.
    pub fn sorted(&self) -> Self {
        Self(self.0.iter().copied().sorted().collect())
    }

    /// The queue with every piece mirrored, order kept.
    pub fn mirrored(&self) -> Self {
        Self(self.0.iter().map(|piece| piece.mirror()).collect())
    }

    /// This queue followed by `other`.
    pub fn concat(&self, other: &Self) -> Self {
        let mut pieces = Vec::with_capacity(self.len() + other.len());
        pieces.extend_from_slice(&self.0);
        pieces.extend_from_slice(&other.0);
        Self(pieces)
    }

    /// Pieces from `start` up to `end`, clamped to the queue like a string slice.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.len());
        if start >= end {
            return Self::default();
        }
        Self(self.0[start..end].to_vec())
    }

    /// Occurrences per piece, indexed by rank minus one.
    pub fn counts(&self) -> PieceCounts {
        let mut counts = [0; 7];
        for piece in &self.0 {
            counts[piece.index()] += 1;
        }
        counts
    }

    /// Occurrences of `piece`.
    pub fn count(&self, piece: Piece) -> usize {
        self.0.iter().filter(|p| **p == piece).count()
    }

    /// Whether every piece of `self` appears in `other` at least as often.
    pub fn is_multiset_subset_of(&self, other: &Self) -> bool {
        let wanted = self.counts();
        let available = other.counts();
        wanted.iter().zip(available.iter()).all(|(w, a)| a >= w)
    }

    /// Sum of the character codes of every piece letter.
    pub fn char_code_sum(&self) -> u32 {
        self.0.iter().map(|piece| piece.char_code()).sum()
    }
}

impl From<Vec<Piece>> for Queue {
    fn from(value: Vec<Piece>) -> Self {
        Self(value)
    }
}

impl FromIterator<Piece> for Queue {
    fn from_iter<T: IntoIterator<Item = Piece>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for Queue {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars().map(Piece::try_from).collect::<Result<Vec<_>, _>>().map(Self)
    }
}

impl Display for Queue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for piece in &self.0 {
            write!(f, "{}", piece.to_char())?;
        }
        Ok(())
    }
}

impl Ord for Queue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.len().cmp(&other.len()).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Queue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Counts of `minuend` minus counts of `subtrahend`, possibly negative.
pub(crate) fn multiset_difference(minuend: &Queue, subtrahend: &Queue) -> [isize; 7] {
    let mut diff = [0isize; 7];
    for piece in minuend.iter() {
        diff[piece.index()] += 1;
    }
    for piece in subtrahend.iter() {
        diff[piece.index()] -= 1;
    }
    diff
}

/// Expand counts back into a queue in rank order, dropping non-positive entries.
pub(crate) fn positive_part(counts: &[isize; 7]) -> Queue {
    BAG.iter()
        .flat_map(|piece| std::iter::repeat(*piece).take(counts[piece.index()].max(0) as usize))
        .collect()
}
