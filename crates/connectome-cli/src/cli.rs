// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Command Line
// ─────────────────────────────────────────────────────────────────────

use std::path::PathBuf;

use clap::Parser;

use connectome_types::{ConnectomeError, ConnectomeResult, GridConfig, GridSpec};

const AFTER_HELP: &str = "\
Network definitions (-n):
   corr           Pearson correlation
   ridge          ridge-regularized partial correlation with rho=1.0
   ridge:<rho>    ridge-regularized partial correlation with the given rho

Thresholds (-t <type>:<value> or <type>:<low>:<step>:<high>):
   absolute          weights at or above the value are retained
   proportional      the given proportion of strongest weights is retained
   nnegproportional  as proportional, negative weights are always removed
absolute:-1.0 is equivalent to no thresholding.

Measures (-m):
   global:charpath
   global:clustering_coef
   global:efficiency";

/// Graph measures of connectivity networks over a parameter grid.
#[derive(Parser, Debug)]
#[command(name = "connectome", version)]
#[command(about = "Graph measures of connectivity networks over a parameter grid")]
#[command(after_help = AFTER_HELP)]
pub struct Args {
    /// Input text file; rows are samples (time points), columns are nodes.
    #[arg(short = 'p', long = "input", value_name = "FILE")]
    pub input: PathBuf,

    /// Output prefix; results are written to `<prefix>.txt`.
    #[arg(short = 'o', long = "output", value_name = "PREFIX")]
    pub output: String,

    /// Network definition scheme (repeatable).
    #[arg(short = 'n', long = "network", required = true, value_name = "SCHEME")]
    pub networks: Vec<String>,

    /// Threshold rule or range (repeatable).
    #[arg(short = 't', long = "threshold", required = true, value_name = "RULE")]
    pub thresholds: Vec<String>,

    /// Measure to compute (repeatable).
    #[arg(short = 'm', long = "measure", required = true, value_name = "MEASURE")]
    pub measures: Vec<String>,

    /// Enable debug logging.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// JSON file with grid configuration; flags below override it.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Worker threads (default: all cores).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Per-worker scratch arena in MiB (default: sized to the run).
    #[arg(long, env = "CONNECTOME_ARENA_MB")]
    pub arena_mb: Option<usize>,

    /// Block edge of the shortest-path solver.
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Do not log progress.
    #[arg(long)]
    pub no_progress: bool,
}

impl Args {
    pub fn grid_spec(&self) -> ConnectomeResult<GridSpec> {
        let spec = GridSpec::parse(&self.networks, &self.thresholds, &self.measures)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Config file (if any), then flag overrides, then validation.
    pub fn grid_config(&self) -> ConnectomeResult<GridConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|e| {
                    ConnectomeError::Io(format!("{}: {e}", path.display()))
                })?;
                GridConfig::from_json(&json)?
            }
            None => GridConfig::default(),
        };
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        if self.arena_mb.is_some() {
            config.arena_mb = self.arena_mb;
        }
        if let Some(b) = self.block_size {
            config.block_size = b;
        }
        if self.no_progress {
            config.progress = false;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.txt", self.output))
    }
}
