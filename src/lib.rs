#![warn(missing_docs)]

//! # `pcsaves`
//!
//! Tooling for a Tetris perfect clear setup knowledge base.
//! Given a setup and a table of the queues that may follow it, work out which pieces can be saved
//! (held back) while still perfect clearing, how often a wanted save is achievable, and the
//! smallest set of example solutions (fumens) that covers every queue where it is.
//!
//! * [`pattern`] expands extended sfinder notation such as `*p4{T<I}` into concrete queues.
//! * [`query`] parses wanted-save expressions such as `T && !/^O/` and evaluates them against the
//!   save alternatives of a row.
//! * [`SavesReader`] reconciles a saves table with the setup it was generated for.
//! * [`Filter`] and [`percent`] turn the table into per-query fractions, the union of the
//!   accepted solutions and a ranked minimal set of solutions.
//!
//! Fumens are opaque to this crate; [`FumenCodec`] is the seam for whatever serializes them.
//!
//! # Internals
//! Minimal sets are minimum hitting sets: every queue needs at least one chosen solution that
//! realizes an accepted save for it. The coverage graph is split into connected components,
//! each reduced and then solved exactly as a Boolean satisfiability problem with a cardinality
//! bound. Large instances and instances running past their time budget go to a
//! [`CoverHeuristic`] instead, such as the [`PathFilter`] jar.

pub use config::{PathFilterConfig, SavesConfig, SolverConfig};
pub use coverage::{CoverageGraph, PathRow};
pub use error::{CodecError, CoverageError, DataError, Error, FractionError, ParseError, Result};
pub use filter::{percent, Filter, FilterOutput, MinimalSolves, RankedSolution};
pub use fraction::Fraction;
pub use fumen::{Field, Fumen, FumenCodec, Mino, Page};
pub use heuristic::{Candidate, CoverHeuristic, PathFilter};
pub use pattern::{expand, mirror_pattern, pieces_contains, ExpandedPattern};
pub use piece::{Piece, Queue, BAG};
pub use query::WantedSave;
pub use reader::{SavesReader, SavesRow};

mod tests;
pub mod config;
pub(crate) mod coverage;
pub mod error;
pub(crate) mod filter;
pub mod formulas;
pub(crate) mod fraction;
pub mod fumen;
pub(crate) mod heuristic;
pub(crate) mod logic;
pub(crate) mod minimal;
pub(crate) mod modifier;
pub mod pattern;
pub(crate) mod piece;
pub mod query;
pub mod reader;
#[cfg(feature = "wasm")]
pub mod wasm;
