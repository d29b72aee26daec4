// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Grid Orchestrator
// ─────────────────────────────────────────────────────────────────────
//! Sweep definitions × thresholds × measures over one sample matrix.
//!
//! Two levels of parallelism share one rayon pool:
//!
//! - **Outer**: the definitions are split into at most one contiguous
//!   slice per worker thread. Each slice runs as one job that walks its
//!   definitions in order with a private scratch [`Arena`]; the arenas are
//!   allocated before the sweep, so their number never exceeds the worker
//!   count however rayon interleaves the jobs.
//! - **Inner**: the blocked shortest-path task graph and the row-parallel
//!   kernels run nested inside each job.
//!
//! Within one definition the thresholds are applied to a single working
//! matrix in ascending cutoff order, so each step only zeroes more
//! entries. Measures always run on a fresh copy.

use rayon::prelude::*;

use connectome_types::{
    ColumnLabel, ConnectomeError, ConnectomeResult, GridConfig, GridSpec, MeasureKind,
    NetworkDefinition, ResultTensor,
};

use crate::arena::{Arena, Frame};
use crate::network::{self, SampleMatrix};
use crate::pathlength::{self, PathMetrics};
use crate::progress::Progress;
use crate::threshold::{self, ThresholdPlan};
use crate::triangles::{self, ClusteringMetrics};

/// Result of a grid run.
#[derive(Debug, Clone)]
pub struct GridOutput {
    pub tensor: ResultTensor,
    /// One (definition, threshold) pair per column, definition-major.
    pub column_labels: Vec<ColumnLabel>,
    /// One label per global measure.
    pub row_labels: Vec<String>,
}

/// Runs parameter grids with a fixed configuration.
pub struct GridRunner {
    config: GridConfig,
    pool: Option<rayon::ThreadPool>,
}

impl GridRunner {
    /// Validate `config` and build the worker pool when `threads` is set.
    pub fn new(config: GridConfig) -> ConnectomeResult<Self> {
        config.validate()?;
        let pool = match config.threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("connectome-{i}"))
                    .build()
                    .map_err(|e| ConnectomeError::Config(format!("thread pool: {e}")))?,
            ),
            None => None,
        };
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Scratch values one worker needs for `spec` over `n` nodes.
    pub fn arena_len(&self, spec: &GridSpec, n: usize) -> usize {
        let nn = n * n;
        let kinds = measure_kinds(spec);
        let network = spec
            .definitions
            .iter()
            .map(|d| network::scratch_len(d, n))
            .max()
            .unwrap_or(0);
        let paths = if kinds.iter().any(MeasureKind::needs_paths) {
            pathlength::scratch_len(n, self.config.block_size)
        } else {
            0
        };
        let clustering = if kinds.contains(&MeasureKind::ClusteringCoefficient) {
            triangles::scratch_len(n)
        } else {
            0
        };
        // working network + max(build scratch, sort scratch, measure copy + kernel scratch)
        nn + network.max(nn).max(nn + paths.max(clustering))
    }

    /// Compute every requested global measure for every
    /// (definition × threshold) pair.
    pub fn run(&self, samples: &SampleMatrix, spec: &GridSpec) -> ConnectomeResult<GridOutput> {
        spec.validate()?;
        let n = samples.nodes();
        let need = self.arena_len(spec, n);
        let capacity = self.config.arena_values().unwrap_or(need);
        if capacity < need {
            log::error!(
                "scratch arena of {capacity} values cannot hold the {need} values one worker needs"
            );
            return Err(ConnectomeError::ArenaExhausted {
                requested: need,
                available: capacity,
                capacity,
            });
        }

        let kinds = measure_kinds(spec);
        let mut tensor = ResultTensor::for_grid(spec, n);
        let progress = Progress::new(tensor.n_columns(), self.config.progress);
        log::info!(
            "grid: {} definitions × {} thresholds × {} measures over {n} nodes, {} samples",
            spec.definitions.len(),
            spec.thresholds.len(),
            kinds.len(),
            samples.samples()
        );
        log::debug!(
            "per-worker arena: {capacity} values ({:.1} MiB)",
            (capacity * std::mem::size_of::<f64>()) as f64 / (1024.0 * 1024.0)
        );

        let stride = tensor.definition_stride();
        let block_size = self.config.block_size;
        let workers = self
            .pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, rayon::ThreadPool::current_num_threads);
        let per_job = spec.definitions.len().div_ceil(workers.max(1));
        let jobs = spec.definitions.len().div_ceil(per_job);
        // One arena per job, created on this thread; jobs never allocate one.
        let mut arenas: Vec<Arena> = (0..jobs).map(|_| Arena::with_capacity(capacity)).collect();
        log::debug!("{jobs} outer jobs of up to {per_job} definitions");

        let mut sweep = || {
            tensor
                .global
                .par_chunks_mut(stride * per_job)
                .zip(spec.definitions.par_chunks(per_job))
                .zip(arenas.par_iter_mut())
                .try_for_each(|((out, definitions), arena)| -> ConnectomeResult<()> {
                    for (out, definition) in out.chunks_mut(stride).zip(definitions) {
                        evaluate_definition(
                            definition,
                            samples,
                            spec,
                            &kinds,
                            out,
                            block_size,
                            arena,
                            &progress,
                        )?;
                    }
                    Ok(())
                })
        };
        match &self.pool {
            Some(pool) => pool.install(sweep)?,
            None => sweep()?,
        }
        drop(arenas);

        log::info!("grid finished: {} networks evaluated", progress.done());
        Ok(GridOutput {
            column_labels: spec.column_labels(),
            row_labels: spec.row_labels(),
            tensor,
        })
    }
}

fn measure_kinds(spec: &GridSpec) -> Vec<MeasureKind> {
    spec.global_measures().map(|m| m.kind).collect()
}

#[allow(clippy::too_many_arguments)]
fn evaluate_definition(
    definition: &NetworkDefinition,
    samples: &SampleMatrix,
    spec: &GridSpec,
    kinds: &[MeasureKind],
    out: &mut [f64],
    block_size: usize,
    arena: &mut Arena,
    progress: &Progress,
) -> ConnectomeResult<()> {
    let n = samples.nodes();
    let mut frame = arena.frame();
    let network = frame.alloc(n * n)?;

    network::build_network(definition, samples, network, &mut frame)?;
    log::debug!("{definition}: network built");

    let plan = frame.scope(|sub| -> ConnectomeResult<ThresholdPlan> {
        let scratch = sub.alloc(n * n)?;
        Ok(ThresholdPlan::build(network, &spec.thresholds, scratch))
    })?;

    evaluate_network(
        network,
        n,
        &plan,
        kinds,
        out,
        block_size,
        &mut frame,
        Some(progress),
    )?;
    log::debug!(
        "{definition}: arena peak {} of {} values",
        arena.peak(),
        arena.capacity()
    );
    Ok(())
}

/// Threshold `network` progressively along `plan` and fill `out`.
///
/// `out` is `[thresholds × kinds]` in request order of both axes. Every
/// slot whose kind matches a computed measure is written. `network` ends
/// up thresholded at the highest cutoff.
///
/// Scratch: `n²` values for the measure copy plus the kernel scratch.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_network(
    network: &mut [f64],
    n: usize,
    plan: &ThresholdPlan,
    kinds: &[MeasureKind],
    out: &mut [f64],
    block_size: usize,
    frame: &mut Frame<'_>,
    progress: Option<&Progress>,
) -> ConnectomeResult<()> {
    let nm = kinds.len();
    debug_assert_eq!(out.len(), plan.len() * nm);
    let want_paths = kinds.iter().any(MeasureKind::needs_paths);
    let want_clustering = kinds.contains(&MeasureKind::ClusteringCoefficient);

    frame.scope(|sub| -> ConnectomeResult<()> {
        let copy = sub.alloc(n * n)?;
        for (index, cutoff) in plan.steps() {
            log::debug!("threshold #{index}: cutoff {cutoff:.6}");
            threshold::apply_absolute(network, cutoff);
            let row = &mut out[index * nm..(index + 1) * nm];

            let paths: Option<PathMetrics> = if want_paths {
                copy.copy_from_slice(network);
                Some(sub.scope(|s| pathlength::pathlength(copy, n, block_size, s))?)
            } else {
                None
            };
            let clustering: Option<ClusteringMetrics> = if want_clustering {
                copy.copy_from_slice(network);
                Some(sub.scope(|s| triangles::clustering(copy, n, s))?)
            } else {
                None
            };

            for (slot, kind) in row.iter_mut().zip(kinds) {
                let value = match kind {
                    MeasureKind::CharacteristicPathLength => {
                        paths.map(|p| p.characteristic_path_length)
                    }
                    MeasureKind::Efficiency => paths.map(|p| p.efficiency),
                    MeasureKind::ClusteringCoefficient => clustering.as_ref().map(|c| c.global),
                };
                if let Some(v) = value {
                    *slot = v;
                }
            }

            if let Some(p) = progress {
                p.tick();
            }
        }
        Ok(())
    })
}
