use std::fmt::{Display, Formatter};

use crate::error::FractionError;

/// A raw `numerator/denominator` count pair.
///
/// Fractions are never reduced; the counts themselves are what gets reported.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Fraction {
    numerator: usize,
    denominator: usize,
}

impl Fraction {
    /// Fails with [`FractionError`] when `denominator` is zero.
    pub fn new(numerator: usize, denominator: usize) -> Result<Self, FractionError> {
        if denominator == 0 {
            return Err(FractionError { numerator });
        }
        Ok(Self { numerator, denominator })
    }

    /// Rows counted.
    pub fn numerator(&self) -> usize {
        self.numerator
    }

    /// Rows seen.
    pub fn denominator(&self) -> usize {
        self.denominator
    }

    /// The fraction as a percentage, e.g. `50.0` for `1/2`.
    pub fn percent(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64 * 100.0
    }

    /// Percentage label attached to ranked solutions, e.g. `66.67% (2/3)`.
    pub fn label(&self) -> String {
        format!("{:.2}% ({}/{})", self.percent(), self.numerator, self.denominator)
    }
}

impl Display for Fraction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
