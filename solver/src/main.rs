use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info, Level};

use pcsaves::{
    expand, mirror_pattern, percent, pieces_contains, CodecError, Filter, Fumen, FumenCodec, Page, PathFilter,
    SavesConfig, SavesReader, SolverConfig, WantedSave,
};

#[derive(Parser)]
#[command(name = "pcsaves", about = "Perfect clear save percentages and minimal solution sets")]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every queue of a pattern.
    Expand {
        pattern: String,
        /// Expand the mirrored pattern instead.
        #[arg(long)]
        mirror: bool,
    },
    /// Print the position of a queue in the expansion of a pattern.
    Contains { queue: String, pattern: String },
    /// Print the pattern with L/J and S/Z swapped.
    Mirror { pattern: String },
    /// Per query, the share of queues for which it is the first satisfied one.
    Percent {
        #[command(flatten)]
        table: TableArgs,
    },
    /// Percentages plus the solutions behind them.
    Filter {
        #[command(flatten)]
        table: TableArgs,
        /// Program converting between fumens and JSON pages (`decode <fumen>`, `encode` on stdin).
        #[arg(long, default_value = "fumen-codec")]
        codec: PathBuf,
        /// TOML file with the solver limits and path-filter settings.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Also output every accepted solution.
        #[arg(long)]
        unique: bool,
        /// Skip the minimal set search.
        #[arg(long)]
        no_minimal: bool,
    },
}

#[derive(Args)]
struct TableArgs {
    /// The saves table CSV.
    #[arg(short, long)]
    table: PathBuf,
    /// Pieces placed by the setup.
    #[arg(short, long)]
    build: String,
    /// Pieces carried over from the previous bag.
    #[arg(short, long)]
    leftover: String,
    /// Perfect clear number.
    #[arg(short, long)]
    pc: u8,
    #[arg(long)]
    twoline: bool,
    #[arg(long, default_value_t = 1)]
    hold: usize,
    /// Wanted save expressions, in priority order.
    #[arg(required = true)]
    queries: Vec<String>,
}

impl TableArgs {
    fn open(&self) -> anyhow::Result<(Vec<WantedSave>, SavesReader)> {
        let queries = self.queries.iter()
            .map(|expression| WantedSave::parse(expression))
            .collect::<Result<Vec<_>, _>>()?;
        let config = SavesConfig::new(&self.build, &self.leftover, self.pc).twoline(self.twoline).hold(self.hold);
        let reader = SavesReader::from_path(config, &self.table)
            .with_context(|| format!("could not load {}", self.table.display()))?;
        Ok((queries, reader))
    }
}

/// A fumen codec behind an external program.
struct CommandCodec {
    program: PathBuf,
}

impl CommandCodec {
    fn failure(&self, output: &std::process::Output) -> String {
        format!("{} exited with {}: {}", self.program.display(), output.status, String::from_utf8_lossy(&output.stderr).trim())
    }
}

impl FumenCodec for CommandCodec {
    fn decode(&self, fumen: &Fumen) -> Result<Vec<Page>, CodecError> {
        let decode_error = |reason: String| CodecError::Decode { fumen: fumen.to_string(), reason };
        let output = Command::new(&self.program)
            .arg("decode")
            .arg(fumen.as_str())
            .output()
            .map_err(|e| decode_error(e.to_string()))?;
        if !output.status.success() {
            return Err(decode_error(self.failure(&output)));
        }
        serde_json::from_slice(&output.stdout).map_err(|e| decode_error(e.to_string()))
    }

    fn encode(&self, pages: &[Page]) -> Result<Fumen, CodecError> {
        let input = serde_json::to_vec(pages).map_err(|e| CodecError::Encode(e.to_string()))?;
        let mut child = Command::new(&self.program)
            .arg("encode")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&input).map_err(|e| CodecError::Encode(e.to_string()))?;
        }
        let output = child.wait_with_output().map_err(|e| CodecError::Encode(e.to_string()))?;
        if !output.status.success() {
            return Err(CodecError::Encode(self.failure(&output)));
        }
        Ok(Fumen::new(String::from_utf8_lossy(&output.stdout).trim()))
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SolverConfig> {
    let Some(path) = path else {
        return Ok(SolverConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))?;
    let config = toml::from_str(&text).with_context(|| format!("invalid solver config {}", path.display()))?;
    debug!(?config, "loaded solver config");
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Expand { pattern, mirror } => {
            let pattern = if mirror { mirror_pattern(&pattern) } else { pattern };
            for queue in expand(&pattern)? {
                println!("{queue}");
            }
        }
        Commands::Contains { queue, pattern } => match pieces_contains(&queue, &pattern)? {
            Some(index) => println!("{index}"),
            None => bail!("{queue} is not part of {pattern}"),
        },
        Commands::Mirror { pattern } => println!("{}", mirror_pattern(&pattern)),
        Commands::Percent { table } => {
            let (queries, reader) = table.open()?;
            for (query, fraction) in queries.iter().zip(percent(&queries, &reader)?) {
                println!("{}: {}", query.expression(), fraction.label());
            }
        }
        Commands::Filter { table, codec, config, unique, no_minimal } => {
            let (queries, reader) = table.open()?;
            let config = load_config(config.as_deref())?;
            let codec = CommandCodec { program: codec };
            let path_filter = PathFilter::new(config.path_filter.clone());

            info!(rows = reader.len(), queries = queries.len(), "filtering saves table");
            let output = Filter::new(&codec)
                .config(config)
                .heuristic(&path_filter)
                .unique_solves(unique)
                .minimal_solves(!no_minimal)
                .run(&queries, &reader)?;

            for (query, fraction) in queries.iter().zip(&output.fractions) {
                println!("{}: {}", query.expression(), fraction.label());
            }
            if let Some(fumen) = output.unique_solves {
                println!("unique solves: {fumen}");
            }
            if let Some(minimal) = output.minimal_solves {
                let kind = if minimal.true_minimal { "true minimal" } else { "minimal (heuristic)" };
                println!("{kind}: {}", minimal.combined);
                for ranked in &minimal.ranked {
                    println!("  {} {}", ranked.fraction.label(), ranked.fumen);
                }
            }
        }
    }

    Ok(())
}
