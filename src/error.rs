//! Error types shared by every component of the crate.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed pattern or wanted-save query syntax.
///
/// Every variant carries the offending substring so the caller can point at it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A character that is not one of `TILJSZO` appeared where a piece was expected.
    #[error("the piece '{0}' is not a valid piece")]
    InvalidPiece(char),
    /// A pattern part could not be split into a piece spec and a permutation suffix.
    #[error("failed to separate '{0}' into pieces and permutation parts")]
    UnrecognizedPieces(String),
    /// File inclusion (`<file>`) is not supported by the expansion engine.
    #[error("file inclusion '{0}' is not supported")]
    FileInclusion(String),
    /// A `[^...]` set excluded every piece.
    #[error("empty actual pieces from '{0}'")]
    EmptyPieceSet(String),
    /// `p<N>` asked for more pieces than the piece set provides.
    #[error("'{pattern}' has p{length} even though '{pieces}' has length {available}")]
    PermutationTooLong {
        /// The pattern being expanded.
        pattern: String,
        /// The piece spec the suffix was attached to.
        pieces: String,
        /// Requested selection length.
        length: usize,
        /// Number of pieces in the set.
        available: usize,
    },
    /// A `(` without a matching `)`, or the reverse.
    #[error("unmatched parenthesis in '{0}'")]
    UnmatchedParenthesis(String),
    /// A `[` without a matching `]`, or the reverse.
    #[error("unmatched bracket in '{0}'")]
    UnmatchedBracket(String),
    /// A `{` modifier was never closed with `}`.
    #[error("modifier didn't close '{0}'")]
    UnclosedModifier(String),
    /// A `/regex/` literal was never closed.
    #[error("no closing slash for regex at '{0}'")]
    UnclosedRegex(String),
    /// A lone `&` or `|` in a modifier.
    #[error("missing second character of '{0}'")]
    LoneOperator(char),
    /// Two modifier clauses without an operator, or an operator without a clause.
    #[error("incomplete modifier '{0}'")]
    IncompleteModifier(String),
    /// A modifier clause that is neither a count, a before nor a regex predicate.
    #[error("unrecognized modifier clause '{0}'")]
    UnrecognizedModifier(String),
    /// A regex literal that the regex engine rejected.
    #[error("invalid regex '{pattern}': {reason}")]
    InvalidRegex {
        /// The regex source between the slashes.
        pattern: String,
        /// Why the regex engine rejected it.
        reason: String,
    },
    /// Query text that no token matches.
    #[error("expression '{expression}' could not be tokenized at '{remainder}'")]
    UnknownToken {
        /// The whole expression.
        expression: String,
        /// The input starting at the first unmatched character.
        remainder: String,
    },
    /// A query that produced no tokens at all.
    #[error("expression '{0}' could not be tokenized")]
    NoTokens(String),
    /// A token that does not fit the grammar at its position.
    #[error("unexpected token {found} in '{expression}'")]
    UnexpectedToken {
        /// The whole expression.
        expression: String,
        /// Rendered form of the token found.
        found: String,
    },
    /// The expression ended while a term was still expected.
    #[error("unexpected end of expression '{0}'")]
    UnexpectedEnd(String),
    /// Tokens left over after a complete expression.
    #[error("trailing input after complete expression in '{expression}' starting at {found}")]
    TrailingInput {
        /// The whole expression.
        expression: String,
        /// Rendered form of the first unconsumed token.
        found: String,
    },
}

/// The tabular data does not fit the configured setup.
#[derive(Error, Debug)]
pub enum DataError {
    /// Required columns are absent from the source header.
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    /// `build + queue` cannot add up to a perfect clear of the configured size.
    #[error("full queue could not produce a {lines}l PC. Likely build '{build}' is too short")]
    QueueLength {
        /// The configured build queue.
        build: String,
        /// Length of `build + queue`.
        length: usize,
        /// 2 for two-line, 4 otherwise.
        lines: u8,
    },
    /// A queue or save column held something other than pieces.
    #[error("invalid queue '{value}' in record {record}: {source}")]
    InvalidQueue {
        /// The offending cell.
        value: String,
        /// One-based record number.
        record: usize,
        /// Why it failed to parse.
        source: ParseError,
    },
    /// The perfect-clear number is outside 1..=9.
    #[error("perfect clear number {0} is out of range")]
    PcNumber(u8),
    /// The CSV layer failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// The source file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A [`Fraction`](crate::Fraction) was built with a zero denominator.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("denominator is zero (numerator {numerator})")]
pub struct FractionError {
    /// The numerator that was supplied.
    pub numerator: usize,
}

/// The example-solution codec failed.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The serialized diagram could not be decoded.
    #[error("could not decode fumen '{fumen}': {reason}")]
    Decode {
        /// The fumen given to the codec.
        fumen: String,
        /// Why decoding failed.
        reason: String,
    },
    /// Pages could not be encoded.
    #[error("could not encode pages: {0}")]
    Encode(String),
    /// A field row was wider than the board or held an unknown cell.
    #[error("invalid field row '{0}'")]
    InvalidField(String),
    /// Combining needs at least one fumen.
    #[error("nothing to combine")]
    Empty,
}

/// Minimal coverage search failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoverageError {
    /// The exact search ran past its deadline.
    #[error("exact minimal search exceeded its time budget")]
    TimedOut,
    /// The SAT backend failed.
    #[error("SAT solver failure: {0}")]
    Solver(String),
    /// The external heuristic could not be run or produced unusable output.
    #[error("heuristic minimizer failed: {0}")]
    Heuristic(String),
    /// Both the exact search and the fallback failed.
    #[error("minimal set search exhausted: {0}")]
    Exhausted(String),
    /// A solution was selected that the coverage relation does not know about.
    #[error("solution '{0}' is not part of the coverage relation")]
    UnknownSolution(String),
}

/// Any error the crate produces.
#[derive(Error, Debug)]
pub enum Error {
    /// See [`ParseError`].
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    /// See [`DataError`].
    #[error("data error: {0}")]
    Data(#[from] DataError),
    /// See [`FractionError`].
    #[error("fraction error: {0}")]
    Fraction(#[from] FractionError),
    /// See [`CodecError`].
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    /// See [`CoverageError`].
    #[error("coverage error: {0}")]
    Coverage(#[from] CoverageError),
}
