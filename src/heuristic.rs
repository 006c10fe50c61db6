//! Fallback minimizers for coverage instances the exact search cannot finish.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::config::{PathFilterConfig, SolverConfig};
use crate::coverage::{CoverageGraph, PathRow};
use crate::error::CoverageError;
use crate::fumen::Fumen;
use crate::reader::{COLUMN_DELIMITER, COLUMN_FUMENS, COLUMN_FUMEN_COUNT, COLUMN_QUEUE, COLUMN_UNUSED_PIECES, COLUMN_USED_PIECES};

/// One run of a heuristic minimizer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Candidate {
    /// The proposed covering set.
    pub fumens: Vec<Fumen>,
    /// Whether the minimizer itself vouched for the result.
    pub verified: bool,
}

/// Something that proposes a small covering set of fumens for the given rows.
///
/// Proposals are not trusted: coverage is checked again before one is accepted.
pub trait CoverHeuristic {
    /// Propose a covering set of the fumens in `rows`.
    fn candidate(&self, rows: &[PathRow]) -> Result<Candidate, CoverageError>;
}

/// Run `heuristic` until enough verified runs complete, the run limit is hit or time runs out,
/// keeping the smallest proposal that really covers `graph`.
pub(crate) fn fallback(heuristic: &dyn CoverHeuristic, rows: &[PathRow], graph: &CoverageGraph, config: &SolverConfig) -> Result<Vec<usize>, CoverageError> {
    let start = Instant::now();
    let mut best: Option<Vec<usize>> = None;
    let mut iterations = 0;
    let mut completed = 0;

    loop {
        let candidate = heuristic.candidate(rows)?;
        iterations += 1;
        if candidate.verified {
            completed += 1;
        }
        info!(iteration = iterations, solutions = candidate.fumens.len(), verified = candidate.verified, "heuristic run finished");

        match candidate.fumens.iter().map(|fumen| graph.solution_index(fumen)).collect::<Result<Vec<_>, _>>() {
            Ok(indices) if graph.covers(&indices) => {
                if best.as_ref().map_or(true, |current| indices.len() < current.len()) {
                    best = Some(indices);
                }
            }
            Ok(_) => warn!(iteration = iterations, "heuristic proposal leaves patterns uncovered"),
            Err(error) => warn!(iteration = iterations, %error, "heuristic proposal names an unknown solution"),
        }

        if completed >= config.fallback_iterations
            || iterations >= config.max_fallback_iterations
            || start.elapsed() >= config.fallback_time_limit() {
            break;
        }
    }

    best.ok_or_else(|| CoverageError::Exhausted(format!("no covering proposal after {iterations} heuristic runs")))
}

/// The `path-filter` jar, exchanging files in a fresh directory under the work directory.
///
/// Each run writes the rows as a saves table, runs
/// `java -jar path-filter.jar <csv> <out> <arguments...>` and then
/// `java -jar path-filter.jar verify <csv> <out>`, whose stdout says `OK` on success.
/// The output file lists one fumen per line.
#[derive(Clone, Debug)]
pub struct PathFilter {
    config: PathFilterConfig,
}

impl PathFilter {
    /// A minimizer invoked as `config` describes.
    pub fn new(config: PathFilterConfig) -> Self {
        Self { config }
    }

    /// Files of a single run. The directory is removed when they are dropped.
    pub(crate) fn run_files(&self) -> Result<RunFiles, CoverageError> {
        let dir = tempfile::Builder::new()
            .prefix("pcsaves-")
            .tempdir_in(&self.config.work_dir)
            .map_err(|e| CoverageError::Heuristic(format!("could not create a run directory in {}: {e}", self.config.work_dir.display())))?;
        Ok(RunFiles { csv: dir.path().join("path.csv"), output: dir.path().join("output.txt"), dir })
    }

    fn write_rows(&self, path: &Path, rows: &[PathRow]) -> Result<(), CoverageError> {
        let failure = |e: csv::Error| CoverageError::Heuristic(e.to_string());
        let mut writer = csv::Writer::from_path(path).map_err(failure)?;
        writer.write_record([COLUMN_QUEUE, COLUMN_FUMEN_COUNT, COLUMN_USED_PIECES, COLUMN_UNUSED_PIECES, COLUMN_FUMENS]).map_err(failure)?;
        for row in rows {
            let fumens = row.fumens.iter().map(Fumen::as_str).collect::<Vec<_>>().join(&COLUMN_DELIMITER.to_string());
            writer.write_record([row.pattern.to_string(), row.fumens.len().to_string(), String::new(), String::new(), fumens])
                .map_err(failure)?;
        }
        writer.flush().map_err(|e| CoverageError::Heuristic(e.to_string()))
    }

    fn java(&self, arguments: &[&OsStr]) -> Result<String, CoverageError> {
        let output = Command::new(&self.config.java)
            .arg("-jar")
            .arg(&self.config.jar)
            .args(arguments)
            .output()
            .map_err(|e| CoverageError::Heuristic(format!("could not run {}: {e}", self.config.java.display())))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() || !stderr.trim().is_empty() {
            return Err(CoverageError::Heuristic(format!("path-filter exited with {}: {}", output.status, stderr.trim())));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Input and output of one `path-filter` run.
pub(crate) struct RunFiles {
    pub(crate) dir: TempDir,
    pub(crate) csv: PathBuf,
    pub(crate) output: PathBuf,
}

impl CoverHeuristic for PathFilter {
    fn candidate(&self, rows: &[PathRow]) -> Result<Candidate, CoverageError> {
        let files = self.run_files()?;
        debug!(dir = %files.dir.path().display(), rows = rows.len(), "starting path-filter run");
        self.write_rows(&files.csv, rows)?;

        let mut arguments = vec![files.csv.as_os_str(), files.output.as_os_str()];
        arguments.extend(self.config.arguments.iter().map(|argument| OsStr::new(argument.as_str())));
        self.java(&arguments)?;
        let verified = self.java(&[OsStr::new("verify"), files.csv.as_os_str(), files.output.as_os_str()])?.contains("OK");

        let output = std::fs::read_to_string(&files.output)
            .map_err(|e| CoverageError::Heuristic(format!("could not read {}: {e}", files.output.display())))?;
        let fumens = output.trim().lines().map(str::trim).filter(|line| !line.is_empty()).map(Fumen::from).collect();
        Ok(Candidate { fumens, verified })
    }
}
