//! Exact minimum covering sets, found with a SAT solver.
//!
//! # Logical setup
//! Each candidate solution S gets a variable, true when S is chosen.
//! Every pattern P must be covered: at least one solution covering P is chosen.
//! At most k solutions are chosen, for k rising from a lower bound until the formula is
//! satisfiable; the first such k is the minimum.
//!
//! Components of the coverage graph are solved separately, after two reductions that keep at
//! least one minimum set intact: a solution whose patterns are all covered by another solution
//! is dropped, and a pattern only one solution covers forces that solution.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use itertools::Itertools;
use tracing::{debug, info};
use varisat::{CnfFormula, ExtendFormula, Lit, Solver, Var};

use crate::coverage::{Component, CoverageGraph};
use crate::error::CoverageError;
use crate::logic::{at_least_one, at_most, block};

/// Up to `max_sets` distinct minimum covering sets of solution indices, each sorted.
///
/// Fails with [`CoverageError::TimedOut`] once `time_limit` has passed. The worker searching at
/// that moment is told to stop and exits before its next solver call.
pub(crate) fn minimal_sets(graph: &CoverageGraph, max_sets: usize, time_limit: Duration) -> Result<Vec<Vec<usize>>, CoverageError> {
    let deadline = Instant::now() + time_limit;
    let max_sets = max_sets.max(1);

    let mut per_component = Vec::new();
    for component in graph.components() {
        if Instant::now() >= deadline {
            return Err(CoverageError::TimedOut);
        }
        let problem = HittingSet::reduce(graph, &component);
        per_component.push(problem.solve(max_sets, deadline)?);
    }
    if per_component.is_empty() {
        return Ok(vec![Vec::new()]);
    }

    let sets = per_component.into_iter()
        .multi_cartesian_product()
        .take(max_sets)
        .map(|parts| parts.concat().into_iter().sorted().collect_vec())
        .collect_vec();
    info!(size = sets[0].len(), sets = sets.len(), "found minimal sets");
    Ok(sets)
}

/// One component after reduction.
pub(crate) struct HittingSet {
    forced: Vec<usize>,
    candidates: Vec<usize>,
    // positions into `candidates`
    requirements: Vec<Vec<usize>>,
}

impl HittingSet {
    pub(crate) fn reduce(graph: &CoverageGraph, component: &Component) -> Self {
        let mut forced = Vec::new();
        let mut open = component.patterns.clone();
        let mut candidates = component.solutions.clone();

        while !open.is_empty() {
            let before = (open.len(), candidates.len());

            // equal coverage keeps the lower index
            candidates = candidates.iter()
                .copied()
                .filter(|s| !candidates.iter().any(|o| {
                    o != s && graph.dominated_by(*s, *o, &open) && (o < s || !graph.dominated_by(*o, *s, &open))
                }))
                .collect();

            let singles = open.iter()
                .filter_map(|p| candidates.iter().copied().filter(|s| graph.hits(*s, *p)).exactly_one().ok())
                .unique()
                .collect_vec();
            for solution in singles {
                candidates.retain(|s| *s != solution);
                open.retain(|p| !graph.hits(solution, *p));
                forced.push(solution);
            }

            if (open.len(), candidates.len()) == before {
                break;
            }
        }

        let requirements = open.iter()
            .map(|p| candidates.iter().positions(|s| graph.hits(*s, *p)).collect_vec())
            .collect_vec();
        debug!(forced = forced.len(), candidates = candidates.len(), requirements = requirements.len(), "reduced component");
        Self { forced, candidates, requirements }
    }

    /// Size of a greedy cover, always achievable.
    fn upper_bound(&self) -> usize {
        let mut open = self.requirements.clone();
        let mut picks = 0;
        while !open.is_empty() {
            let remaining = open.len();
            let best = (0..self.candidates.len())
                .max_by_key(|c| (open.iter().filter(|r| r.contains(c)).count(), std::cmp::Reverse(*c)))
                .unwrap_or(0);
            open.retain(|r| !r.contains(&best));
            picks += 1;
            if open.len() == remaining {
                break;
            }
        }
        picks
    }

    /// Number of pairwise disjoint requirements, each needing its own pick.
    fn lower_bound(&self) -> usize {
        let mut picked: Vec<&Vec<usize>> = Vec::new();
        for requirement in self.requirements.iter().sorted_by_key(|r| r.len()) {
            if picked.iter().all(|p| p.iter().all(|c| !requirement.contains(c))) {
                picked.push(requirement);
            }
        }
        picked.len()
    }

    pub(crate) fn solve(self, max_sets: usize, deadline: Instant) -> Result<Vec<Vec<usize>>, CoverageError> {
        self.solve_with(max_sets, deadline, |_| ())
    }

    /// [`HittingSet::solve`], handing the worker's join handle to `spawned`.
    pub(crate) fn solve_with(
        self,
        max_sets: usize,
        deadline: Instant,
        spawned: impl FnOnce(thread::JoinHandle<()>),
    ) -> Result<Vec<Vec<usize>>, CoverageError> {
        if self.requirements.is_empty() {
            return Ok(vec![self.forced]);
        }

        let (lower, upper) = (self.lower_bound(), self.upper_bound());
        debug!(lower, upper, "bounds on component cover size");

        let (sender, receiver) = mpsc::channel();
        let requirements = self.requirements.clone();
        let candidates = self.candidates.len();
        let cancelled = Arc::new(AtomicBool::new(false));
        let worker_cancelled = Arc::clone(&cancelled);
        spawned(thread::spawn(move || {
            // the receiver is gone once the deadline passed
            let _ = sender.send(search(candidates, &requirements, lower..=upper, max_sets, &worker_cancelled));
        }));

        let found = match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(found) => found?,
            Err(RecvTimeoutError::Timeout) => {
                cancelled.store(true, Ordering::Relaxed);
                return Err(CoverageError::TimedOut);
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(CoverageError::Solver("search worker stopped without a result".to_string()))
            }
        };

        Ok(found.into_iter()
            .map(|positions| self.forced.iter().copied().chain(positions.into_iter().map(|p| self.candidates[p])).collect())
            .collect())
    }
}

/// Smallest k in `sizes` admitting a cover, then up to `max_sets` covers of that size.
///
/// Checks `cancelled` before every solver call and gives up with [`CoverageError::TimedOut`].
pub(crate) fn search(
    candidates: usize,
    requirements: &[Vec<usize>],
    sizes: std::ops::RangeInclusive<usize>,
    max_sets: usize,
    cancelled: &AtomicBool,
) -> Result<Vec<Vec<usize>>, CoverageError> {
    let stop = || match cancelled.load(Ordering::Relaxed) {
        true => Err(CoverageError::TimedOut),
        false => Ok(()),
    };
    let vars = (0..candidates).map(|index| Var::from_index(index).positive()).collect_vec();
    for k in sizes {
        stop()?;
        let mut formula = CnfFormula::new();
        formula.set_var_count(candidates);
        for requirement in requirements {
            // this pattern is covered by a chosen solution
            for clause in at_least_one(requirement.iter().map(|c| vars[*c]).collect()) {
                formula.add_clause(&clause);
            }
        }
        // no more than k are chosen
        let counter = at_most(&vars, k, || formula.new_var());
        for clause in counter {
            formula.add_clause(&clause);
        }

        let mut solver = Solver::new();
        solver.add_formula(&formula);
        if !solver.solve().map_err(|e| CoverageError::Solver(e.to_string()))? {
            debug!(k, "no cover of this size");
            continue;
        }

        let mut sets = Vec::new();
        loop {
            let model = solver.model().ok_or_else(|| CoverageError::Solver("satisfiable formula without model".to_string()))?;
            let chosen: Vec<Lit> = vars.iter().copied().filter(|var| model.get(var.var().index()).is_some_and(|lit| lit.is_positive())).collect();
            sets.push(chosen.iter().map(|lit| lit.var().index()).collect_vec());
            if sets.len() >= max_sets {
                break;
            }
            for clause in block(&chosen) {
                solver.add_clause(&clause);
            }
            stop()?;
            if !solver.solve().map_err(|e| CoverageError::Solver(e.to_string()))? {
                break;
            }
        }
        return Ok(sets);
    }

    Err(CoverageError::Solver("no cover within the greedy bound".to_string()))
}
