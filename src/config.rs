//! Setup descriptions and search limits, loadable from TOML.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The setup a saves table was generated for.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SavesConfig {
    /// Pieces placed by the setup, in any order.
    pub build: String,
    /// Pieces carried over from the previous bag.
    pub leftover: String,
    /// Which perfect clear of the 7-bag cycle, 1 through 9.
    pub pc_num: u8,
    /// Whether the table is for two-line perfect clears.
    #[serde(default)]
    pub twoline: bool,
    /// Pieces that can sit in hold, added to the allowed queue length.
    #[serde(default = "default_hold")]
    pub hold: usize,
}

fn default_hold() -> usize {
    1
}

impl SavesConfig {
    /// A one-piece hold, four-line setup.
    pub fn new(build: impl Into<String>, leftover: impl Into<String>, pc_num: u8) -> Self {
        Self { build: build.into(), leftover: leftover.into(), pc_num, twoline: false, hold: default_hold() }
    }

    /// Switch to two-line perfect clears.
    pub fn twoline(mut self, twoline: bool) -> Self {
        self.twoline = twoline;
        self
    }

    /// Override the number of held pieces.
    pub fn hold(mut self, hold: usize) -> Self {
        self.hold = hold;
        self
    }
}

/// Limits and external tooling for the minimal set search.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Coverage graphs with at least this many nodes skip the exact search.
    pub node_limit: usize,
    /// Time budget of the exact search, in seconds.
    pub exact_time_limit_secs: u64,
    /// How many distinct minimal sets the exact search enumerates.
    pub max_sets: usize,
    /// Completed (verified) fallback runs wanted before stopping.
    pub fallback_iterations: usize,
    /// Fallback runs after which the search gives up.
    pub max_fallback_iterations: usize,
    /// Time budget of the whole fallback, in seconds.
    pub fallback_time_limit_secs: u64,
    /// Invocation of the bundled heuristic.
    pub path_filter: PathFilterConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            node_limit: 300,
            exact_time_limit_secs: 10 * 60,
            max_sets: 16,
            fallback_iterations: 3,
            max_fallback_iterations: 5,
            fallback_time_limit_secs: 30 * 60,
            path_filter: PathFilterConfig::default(),
        }
    }
}

impl SolverConfig {
    /// [`SolverConfig::exact_time_limit_secs`] as a [`Duration`].
    pub fn exact_time_limit(&self) -> Duration {
        Duration::from_secs(self.exact_time_limit_secs)
    }

    /// [`SolverConfig::fallback_time_limit_secs`] as a [`Duration`].
    pub fn fallback_time_limit(&self) -> Duration {
        Duration::from_secs(self.fallback_time_limit_secs)
    }
}

/// How to invoke the `path-filter` jar.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathFilterConfig {
    /// Java executable.
    pub java: PathBuf,
    /// Location of `path-filter.jar`.
    pub jar: PathBuf,
    /// Directory for the exchanged CSV and output files.
    pub work_dir: PathBuf,
    /// Tuning arguments passed after the input and output paths.
    pub arguments: Vec<String>,
}

impl Default for PathFilterConfig {
    fn default() -> Self {
        Self {
            java: PathBuf::from("java"),
            jar: PathBuf::from("path-filter").join("path-filter.jar"),
            work_dir: std::env::temp_dir(),
            arguments: ["5.0", "6.0", "3.0", "100000"].map(String::from).to_vec(),
        }
    }
}
