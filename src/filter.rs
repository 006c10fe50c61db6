//! Save percentages and minimal solution sets for a saves table.

use std::collections::HashSet;

use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::config::SolverConfig;
use crate::coverage::{CoverageGraph, PathRow};
use crate::error::{CoverageError, FractionError, Result};
use crate::fraction::Fraction;
use crate::fumen::{combine, combine_with_comments, Fumen, FumenCodec};
use crate::heuristic::{fallback, CoverHeuristic};
use crate::minimal::minimal_sets;
use crate::query::{first_match, WantedSave};
use crate::reader::SavesReader;

/// Per query, the share of rows whose first satisfied query is that one.
///
/// Fails with a [`FractionError`] when the table has no rows.
pub fn percent(queries: &[WantedSave], reader: &SavesReader) -> Result<Vec<Fraction>> {
    let mut counters = vec![0; queries.len()];
    let mut total = 0;

    for row in reader.read() {
        let row = row?;
        if let Some(index) = first_match(queries, &row.saves) {
            counters[index] += 1;
        }
        total += 1;
    }

    fractions(&counters, total)
}

fn fractions(counters: &[usize], total: usize) -> Result<Vec<Fraction>> {
    let fractions = counters.iter().map(|count| Fraction::new(*count, total)).collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(fractions)
}

/// A chosen solution with the share of rows covered once it and every earlier one are in place.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RankedSolution {
    /// The chosen solution.
    pub fumen: Fumen,
    /// Covered rows so far over all rows read.
    pub fraction: Fraction,
}

/// The smallest found set of solutions covering every row that has one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MinimalSolves {
    /// Most newly covered rows first.
    pub ranked: Vec<RankedSolution>,
    /// The ranked solutions as one fumen, each commented with its label.
    pub combined: Fumen,
    /// False when the set came from a heuristic and may not be the smallest.
    pub true_minimal: bool,
}

/// Everything [`Filter::run`] computes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FilterOutput {
    /// One per query, in query order.
    pub fractions: Vec<Fraction>,
    /// Every accepted solution in first-seen order, when requested.
    pub unique_solves: Option<Fumen>,
    /// The ranked minimal set, when requested and any row has a solution.
    pub minimal_solves: Option<MinimalSolves>,
}

/// Builder and driver for [`Filter::run`].
pub struct Filter<'a> {
    codec: &'a dyn FumenCodec,
    heuristic: Option<&'a dyn CoverHeuristic>,
    config: SolverConfig,
    unique_solves: bool,
    minimal_solves: bool,
}

impl<'a> Filter<'a> {
    /// Minimal solves on, unique solves off, no fallback heuristic.
    pub fn new(codec: &'a dyn FumenCodec) -> Self {
        Self { codec, heuristic: None, config: SolverConfig::default(), unique_solves: false, minimal_solves: true }
    }

    /// Limits of the minimal set search.
    pub fn config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Used when the exact search is skipped or fails.
    pub fn heuristic(mut self, heuristic: &'a dyn CoverHeuristic) -> Self {
        self.heuristic = Some(heuristic);
        self
    }

    /// Whether to combine every accepted solution into one fumen.
    pub fn unique_solves(mut self, enabled: bool) -> Self {
        self.unique_solves = enabled;
        self
    }

    /// Whether to search for a minimal covering set.
    pub fn minimal_solves(mut self, enabled: bool) -> Self {
        self.minimal_solves = enabled;
        self
    }

    /// Count rows per first satisfied query and gather the fumens of the accepted saves.
    pub fn run(&self, queries: &[WantedSave], reader: &SavesReader) -> Result<FilterOutput> {
        let mut counters = vec![0; queries.len()];
        let mut total = 0;
        let mut unique = Vec::new();
        let mut seen = HashSet::new();
        let mut path_rows = Vec::new();

        for row in reader.read_with_fumens(self.codec) {
            let row = row?;
            total += 1;
            if !row.solveable {
                continue;
            }

            let Some((index, accepted)) = queries.iter()
                .map(|query| query.matching_indices(&row.saves))
                .find_position(|accepted| !accepted.is_empty())
            else {
                continue;
            };
            counters[index] += 1;

            let per_save = row.fumens.unwrap_or_default();
            let fumens = accepted.iter()
                .filter_map(|save| per_save.get(*save))
                .flatten()
                .unique()
                .cloned()
                .collect_vec();

            if self.unique_solves {
                unique.extend(fumens.iter().filter(|fumen| seen.insert((*fumen).clone())).cloned());
            }
            if self.minimal_solves {
                path_rows.push(PathRow { pattern: row.queue, fumens });
            }
        }
        debug!(total, ?counters, rows = path_rows.len(), "filtered saves table");

        let unique_solves = match unique.is_empty() {
            true => None,
            false => Some(combine(self.codec, &unique)?),
        };
        let minimal_solves = match path_rows.is_empty() {
            true => None,
            false => self.minimal(&path_rows, total)?,
        };

        Ok(FilterOutput { fractions: fractions(&counters, total)?, unique_solves, minimal_solves })
    }

    fn minimal(&self, rows: &[PathRow], total: usize) -> Result<Option<MinimalSolves>> {
        let graph = CoverageGraph::from_rows(rows);
        info!(nodes = graph.node_count(), edges = graph.edge_count(), "searching minimal set");

        let (chosen, true_minimal) = if graph.node_count() < self.config.node_limit {
            match minimal_sets(&graph, self.config.max_sets, self.config.exact_time_limit()) {
                Ok(mut sets) => (sets.swap_remove(0), true),
                Err(error) => {
                    warn!(%error, "exact minimal search failed, falling back to heuristic");
                    (self.fallback(rows, &graph)?, false)
                }
            }
        } else {
            info!(limit = self.config.node_limit, "coverage graph too large for the exact search");
            (self.fallback(rows, &graph)?, false)
        };

        if chosen.is_empty() {
            warn!("no retained row has a solution");
            return Ok(None);
        }

        let ranked = rank(&graph, &chosen, total)?
            .into_iter()
            .map(|(solution, fraction)| RankedSolution { fumen: graph.solutions()[solution].clone(), fraction })
            .collect_vec();
        let fumens = ranked.iter().map(|ranked| ranked.fumen.clone()).collect_vec();
        let labels = ranked.iter().map(|ranked| ranked.fraction.label()).collect_vec();
        let combined = combine_with_comments(self.codec, &fumens, &labels)?;

        Ok(Some(MinimalSolves { ranked, combined, true_minimal }))
    }

    fn fallback(&self, rows: &[PathRow], graph: &CoverageGraph) -> std::result::Result<Vec<usize>, CoverageError> {
        match self.heuristic {
            Some(heuristic) => fallback(heuristic, rows, graph, &self.config)
                .map_err(|error| match error {
                    CoverageError::Exhausted(_) => error,
                    other => CoverageError::Exhausted(other.to_string()),
                }),
            None => Err(CoverageError::Exhausted("no fallback heuristic configured".to_string())),
        }
    }
}

/// Order `chosen` by marginal coverage: each pick covers the most rows not yet covered, ties
/// going to the earlier solution. Fractions are cumulative over `total` rows.
pub(crate) fn rank(graph: &CoverageGraph, chosen: &[usize], total: usize) -> std::result::Result<Vec<(usize, Fraction)>, FractionError> {
    let mut covered = HashSet::new();
    let mut remaining = chosen.to_vec();
    let mut ranked = Vec::with_capacity(chosen.len());

    while !remaining.is_empty() {
        let gains = remaining.iter()
            .map(|solution| graph.covered_by(*solution).into_iter().filter(|p| !covered.contains(p)).count())
            .collect_vec();
        // first of the largest
        let (position, _) = gains.iter().enumerate().fold((0, 0), |best, (i, gain)| if *gain > best.1 { (i, *gain) } else { best });
        let solution = remaining.remove(position);
        covered.extend(graph.covered_by(solution));
        ranked.push((solution, Fraction::new(covered.len(), total)?));
    }

    Ok(ranked)
}
