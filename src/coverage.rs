use std::collections::HashMap;

use itertools::Itertools;
use ndarray::{Array2, Zip};
use petgraph::graphmap::UnGraphMap;
use petgraph::unionfind::UnionFind;
use tracing::{debug, warn};

use crate::error::CoverageError;
use crate::fumen::Fumen;
use crate::piece::Queue;

/// A queue that satisfied a wanted save, with every fumen that realizes one of its accepted saves.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathRow {
    /// The queue of the row.
    pub pattern: Queue,
    /// Fumens realizing an accepted save for it.
    pub fumens: Vec<Fumen>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub(crate) enum CoverNode {
    /// Index into the retained rows.
    Pattern(u32),
    /// Index into the distinct solutions, in first-seen order.
    Solution(u32),
}

/// A connected part of the coverage graph. Minimal sets of separate components are independent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Component {
    pub(crate) patterns: Vec<usize>,
    pub(crate) solutions: Vec<usize>,
}

/// Which solution covers which pattern, as a bipartite graph and as an incidence matrix.
///
/// Every pattern must be hit by at least one chosen solution.
#[derive(Clone, Debug)]
pub struct CoverageGraph {
    patterns: Vec<Queue>,
    solutions: Vec<Fumen>,
    solution_index: HashMap<Fumen, usize>,
    graph: UnGraphMap<CoverNode, ()>,
    // patterns x solutions
    incidence: Array2<bool>,
}

impl CoverageGraph {
    /// Rows without any fumen cannot be covered and are left out.
    pub fn from_rows(rows: &[PathRow]) -> Self {
        let mut patterns = Vec::with_capacity(rows.len());
        let mut solutions = Vec::new();
        let mut solution_index = HashMap::new();
        let mut graph = UnGraphMap::new();

        for row in rows {
            if row.fumens.is_empty() {
                warn!(pattern = %row.pattern, "row has no solution and cannot be covered");
                continue;
            }
            let pattern = CoverNode::Pattern(patterns.len() as u32);
            patterns.push(row.pattern.clone());
            graph.add_node(pattern);

            for fumen in &row.fumens {
                let index = *solution_index.entry(fumen.clone()).or_insert_with(|| {
                    solutions.push(fumen.clone());
                    solutions.len() - 1
                });
                graph.add_edge(pattern, CoverNode::Solution(index as u32), ());
            }
        }

        let mut incidence = Array2::from_elem((patterns.len(), solutions.len()), false);
        for (a, b, _) in graph.all_edges() {
            if let (CoverNode::Pattern(p), CoverNode::Solution(s)) | (CoverNode::Solution(s), CoverNode::Pattern(p)) = (a, b) {
                incidence[[p as usize, s as usize]] = true;
            }
        }

        debug!(patterns = patterns.len(), solutions = solutions.len(), edges = graph.edge_count(), "built coverage graph");
        Self { patterns, solutions, solution_index, graph, incidence }
    }

    /// Patterns plus distinct solutions.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Covering pairs.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Retained patterns, indexed like the requirements.
    pub fn patterns(&self) -> &[Queue] {
        &self.patterns
    }

    /// Distinct solutions in first-seen order.
    pub fn solutions(&self) -> &[Fumen] {
        &self.solutions
    }

    /// Position of `fumen` among [`CoverageGraph::solutions`].
    pub fn solution_index(&self, fumen: &Fumen) -> Result<usize, CoverageError> {
        self.solution_index.get(fumen).copied().ok_or_else(|| CoverageError::UnknownSolution(fumen.to_string()))
    }

    /// Indices of the patterns `solution` covers.
    pub fn covered_by(&self, solution: usize) -> Vec<usize> {
        self.incidence.column(solution).iter().positions(|covers| *covers).collect()
    }

    /// Indices of the solutions covering `pattern`.
    pub fn covering(&self, pattern: usize) -> Vec<usize> {
        self.incidence.row(pattern).iter().positions(|covers| *covers).collect()
    }

    /// Whether every pattern is covered by one of `solutions`.
    pub fn covers(&self, solutions: &[usize]) -> bool {
        self.incidence.rows().into_iter().all(|row| solutions.iter().any(|s| row[*s]))
    }

    pub(crate) fn hits(&self, solution: usize, pattern: usize) -> bool {
        self.incidence[[pattern, solution]]
    }

    /// Whether `other` covers every pattern of `patterns` that `solution` covers.
    pub(crate) fn dominated_by(&self, solution: usize, other: usize, patterns: &[usize]) -> bool {
        let mine = self.incidence.column(solution);
        let theirs = self.incidence.column(other);
        if patterns.len() == self.patterns.len() {
            return Zip::from(&mine).and(&theirs).all(|m, t| !*m || *t);
        }
        patterns.iter().all(|p| !mine[*p] || theirs[*p])
    }

    pub(crate) fn components(&self) -> Vec<Component> {
        let offset = self.patterns.len();
        let id = |node: CoverNode| match node {
            CoverNode::Pattern(p) => p as usize,
            CoverNode::Solution(s) => offset + s as usize,
        };

        let mut union_find = UnionFind::new(offset + self.solutions.len());
        for (a, b, _) in self.graph.all_edges() {
            union_find.union(id(a), id(b));
        }

        let mut components: HashMap<usize, Component> = HashMap::new();
        for node in self.graph.nodes().sorted() {
            let component = components.entry(union_find.find(id(node)))
                .or_insert_with(|| Component { patterns: Vec::new(), solutions: Vec::new() });
            match node {
                CoverNode::Pattern(p) => component.patterns.push(p as usize),
                CoverNode::Solution(s) => component.solutions.push(s as usize),
            }
        }

        components.into_values().sorted_by_key(|component| component.patterns.first().copied()).collect()
    }
}
