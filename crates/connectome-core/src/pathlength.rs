// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Blocked All-Pairs Shortest Paths
// ─────────────────────────────────────────────────────────────────────
//! Shortest-path measures over a weighted network.
//!
//! Weights become distances (`1/w`), all-pairs shortest paths are solved
//! with a blocked Floyd–Warshall, and the distance matrix is reduced to
//! global efficiency and characteristic path length.
//!
//! # Blocked scheduling
//!
//! The padded distance matrix is split into `m × m` square blocks. For
//! every pivot block index `k` there are four kinds of block task:
//!
//! | Task | Writes | Reads |
//! | :-- | :-- | :-- |
//! | `Diagonal(k)` | `(k,k)` | – |
//! | `Row(k,j)` | `(k,j)` | `(k,k)` |
//! | `Column(i,k)` | `(i,k)` | `(k,k)` |
//! | `Interior(i,j)` | `(i,j)` | `(i,k)`, `(k,j)` |
//!
//! Tasks are listed in the sequential order of the classical blocked
//! algorithm. Edges are derived from each task's read and write sets:
//! read-after-write, write-after-write and write-after-read against the
//! tasks listed before it. Any execution respecting those edges therefore
//! produces the sequential result. Execution uses one atomic pending count
//! per task; a task is spawned on the rayon scope when its count reaches
//! zero.
//!
//! Each block is wrapped in a `parking_lot::RwLock` over its arena slice.
//! The edges guarantee the locks are never contended; they exist so that
//! block access stays safe code.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use rayon::prelude::*;

use connectome_types::ConnectomeResult;

use crate::arena::Frame;

/// Global shortest-path measures of one network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathMetrics {
    /// Mean inverse distance over ordered pairs `i ≠ j`.
    pub efficiency: f64,
    /// Mean of all finite distances.
    pub characteristic_path_length: f64,
}

/// Convert weights to distances in place: `1/w` for `|w| > ε`, otherwise
/// unreachable (`+∞`). The diagonal is set to 0.
pub fn weights_to_distances(c: &mut [f64], n: usize) {
    c.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        for (j, v) in row.iter_mut().enumerate() {
            *v = if i == j {
                0.0
            } else if v.abs() > f64::EPSILON {
                1.0 / *v
            } else {
                f64::INFINITY
            };
        }
    });
}

/// Block edge actually used for `n` nodes and the requested size.
pub fn effective_block_size(n: usize, block_size: usize) -> usize {
    block_size.min(n).max(1)
}

/// Scratch values [`blocked_floyd_warshall`] draws from the arena.
pub fn scratch_len(n: usize, block_size: usize) -> usize {
    let b = effective_block_size(n, block_size);
    let p = n.div_ceil(b) * b;
    p * p
}

// ── Block kernels ───────────────────────────────────────────────────

fn relax_diagonal(c: &mut [f64], b: usize) {
    for k in 0..b {
        for i in 0..b {
            let cik = c[i * b + k];
            if cik == f64::INFINITY {
                continue;
            }
            for j in 0..b {
                let via = cik + c[k * b + j];
                if via < c[i * b + j] {
                    c[i * b + j] = via;
                }
            }
        }
    }
}

/// Pivot row block: `c[i][j] = min(c[i][j], diag[i][k] + c[k][j])`.
fn relax_row(c: &mut [f64], diag: &[f64], b: usize) {
    for k in 0..b {
        for i in 0..b {
            let dik = diag[i * b + k];
            if dik == f64::INFINITY {
                continue;
            }
            for j in 0..b {
                let via = dik + c[k * b + j];
                if via < c[i * b + j] {
                    c[i * b + j] = via;
                }
            }
        }
    }
}

/// Pivot column block: `c[i][j] = min(c[i][j], c[i][k] + diag[k][j])`.
fn relax_column(c: &mut [f64], diag: &[f64], b: usize) {
    for k in 0..b {
        for i in 0..b {
            let cik = c[i * b + k];
            if cik == f64::INFINITY {
                continue;
            }
            for j in 0..b {
                let via = cik + diag[k * b + j];
                if via < c[i * b + j] {
                    c[i * b + j] = via;
                }
            }
        }
    }
}

/// Interior block: `c[i][j] = min(c[i][j], col[i][k] + row[k][j])`.
fn relax_interior(c: &mut [f64], col: &[f64], row: &[f64], b: usize) {
    for i in 0..b {
        let ci = &mut c[i * b..(i + 1) * b];
        for k in 0..b {
            let cik = col[i * b + k];
            if cik == f64::INFINITY {
                continue;
            }
            let rk = &row[k * b..(k + 1) * b];
            for (dst, &r) in ci.iter_mut().zip(rk) {
                let via = cik + r;
                if via < *dst {
                    *dst = via;
                }
            }
        }
    }
}

// ── Task graph ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockTask {
    Diagonal { k: usize },
    Row { k: usize, j: usize },
    Column { i: usize, k: usize },
    Interior { i: usize, j: usize, k: usize },
}

impl BlockTask {
    /// Block written, as `(row, col)`.
    fn target(&self) -> (usize, usize) {
        match *self {
            BlockTask::Diagonal { k } => (k, k),
            BlockTask::Row { k, j } => (k, j),
            BlockTask::Column { i, k } => (i, k),
            BlockTask::Interior { i, j, .. } => (i, j),
        }
    }

    /// Blocks read besides the target.
    fn sources(&self) -> ([(usize, usize); 2], usize) {
        match *self {
            BlockTask::Diagonal { .. } => ([(0, 0); 2], 0),
            BlockTask::Row { k, .. } | BlockTask::Column { k, .. } => ([(k, k), (0, 0)], 1),
            BlockTask::Interior { i, j, k } => ([(i, k), (k, j)], 2),
        }
    }
}

/// Explicit dependency graph over the block tasks of one solve.
#[derive(Debug)]
struct TaskGraph {
    tasks: Vec<BlockTask>,
    successors: Vec<Vec<usize>>,
    indegree: Vec<usize>,
}

impl TaskGraph {
    fn build(m: usize) -> Self {
        let mut tasks = Vec::with_capacity(m * m * m);
        for k in 0..m {
            tasks.push(BlockTask::Diagonal { k });
            tasks.extend((0..m).filter(|&j| j != k).map(|j| BlockTask::Row { k, j }));
            tasks.extend((0..m).filter(|&i| i != k).map(|i| BlockTask::Column { i, k }));
            for i in (0..m).filter(|&i| i != k) {
                tasks.extend((0..m).filter(|&j| j != k).map(|j| BlockTask::Interior { i, j, k }));
            }
        }

        let mut last_writer: Vec<Option<usize>> = vec![None; m * m];
        let mut readers: Vec<Vec<usize>> = vec![Vec::new(); m * m];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
        let mut indegree = vec![0usize; tasks.len()];
        let mut preds: Vec<usize> = Vec::new();

        for (id, task) in tasks.iter().enumerate() {
            let (ti, tj) = task.target();
            let target = ti * m + tj;
            let (srcs, nsrc) = task.sources();

            preds.clear();
            // read-after-write
            for &(si, sj) in &srcs[..nsrc] {
                preds.extend(last_writer[si * m + sj]);
            }
            // write-after-write, write-after-read
            preds.extend(last_writer[target]);
            preds.extend(readers[target].iter().copied());
            preds.sort_unstable();
            preds.dedup();

            for &p in &preds {
                successors[p].push(id);
            }
            indegree[id] = preds.len();

            for &(si, sj) in &srcs[..nsrc] {
                readers[si * m + sj].push(id);
            }
            last_writer[target] = Some(id);
            readers[target].clear();
        }

        Self {
            tasks,
            successors,
            indegree,
        }
    }

    fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.indegree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(id, _)| id)
    }
}

struct Solve<'g, 'b> {
    graph: &'g TaskGraph,
    pending: Vec<AtomicUsize>,
    blocks: Vec<RwLock<&'b mut [f64]>>,
    m: usize,
    b: usize,
}

impl<'b> Solve<'_, 'b> {
    fn block(&self, i: usize, j: usize) -> &RwLock<&'b mut [f64]> {
        &self.blocks[i * self.m + j]
    }

    fn execute(&self, id: usize) {
        let b = self.b;
        match self.graph.tasks[id] {
            BlockTask::Diagonal { k } => {
                let mut c = self.block(k, k).write();
                relax_diagonal(&mut **c, b);
            }
            BlockTask::Row { k, j } => {
                let diag = self.block(k, k).read();
                let mut c = self.block(k, j).write();
                relax_row(&mut **c, &**diag, b);
            }
            BlockTask::Column { i, k } => {
                let diag = self.block(k, k).read();
                let mut c = self.block(i, k).write();
                relax_column(&mut **c, &**diag, b);
            }
            BlockTask::Interior { i, j, k } => {
                let col = self.block(i, k).read();
                let row = self.block(k, j).read();
                let mut c = self.block(i, j).write();
                relax_interior(&mut **c, &**col, &**row, b);
            }
        }
    }

    fn run<'s>(&'s self, scope: &rayon::Scope<'s>, id: usize) {
        self.execute(id);
        for &next in &self.graph.successors[id] {
            if self.pending[next].fetch_sub(1, Ordering::AcqRel) == 1 {
                scope.spawn(move |s| self.run(s, next));
            }
        }
    }
}

/// Solve all-pairs shortest paths in place over an `n × n` distance matrix.
///
/// Scratch: [`scratch_len`]`(n, block_size)` values from `frame`.
pub fn blocked_floyd_warshall(
    d: &mut [f64],
    n: usize,
    block_size: usize,
    frame: &mut Frame<'_>,
) -> ConnectomeResult<()> {
    if n == 0 {
        return Ok(());
    }
    let b = effective_block_size(n, block_size);
    let m = n.div_ceil(b);
    let bb = b * b;

    frame.scope(|sub| -> ConnectomeResult<()> {
        let packed = sub.alloc_filled(m * m * bb, f64::INFINITY)?;
        pack(d, packed, n, m, b);

        let graph = TaskGraph::build(m);
        log::trace!(
            "blocked shortest paths: n={n}, block={b}, {m}×{m} blocks, {} tasks",
            graph.tasks.len()
        );

        let solve = Solve {
            graph: &graph,
            pending: graph.indegree.iter().map(|&c| AtomicUsize::new(c)).collect(),
            blocks: packed.chunks_mut(bb).map(RwLock::new).collect(),
            m,
            b,
        };
        rayon::scope(|s| {
            for root in graph.roots() {
                let solve = &solve;
                s.spawn(move |s| solve.run(s, root));
            }
        });
        drop(solve);

        unpack(packed, d, n, m, b);
        Ok(())
    })
}

fn pack(d: &[f64], packed: &mut [f64], n: usize, m: usize, b: usize) {
    for i in 0..n {
        let (bi, ii) = (i / b, i % b);
        for bj in 0..m {
            let j0 = bj * b;
            let width = b.min(n - j0);
            let off = (bi * m + bj) * b * b + ii * b;
            packed[off..off + width].copy_from_slice(&d[i * n + j0..i * n + j0 + width]);
        }
    }
}

fn unpack(packed: &[f64], d: &mut [f64], n: usize, m: usize, b: usize) {
    for i in 0..n {
        let (bi, ii) = (i / b, i % b);
        for bj in 0..m {
            let j0 = bj * b;
            let width = b.min(n - j0);
            let off = (bi * m + bj) * b * b + ii * b;
            d[i * n + j0..i * n + j0 + width].copy_from_slice(&packed[off..off + width]);
        }
    }
}

/// Classical triple-loop Floyd–Warshall, row-parallel for each pivot.
pub fn floyd_warshall(d: &mut [f64], n: usize) {
    let mut pivot = vec![0.0; n];
    for k in 0..n {
        pivot.copy_from_slice(&d[k * n..(k + 1) * n]);
        d.par_chunks_mut(n).for_each(|row| {
            let dik = row[k];
            if dik == f64::INFINITY {
                return;
            }
            for (dst, &p) in row.iter_mut().zip(&pivot) {
                let via = dik + p;
                if via < *dst {
                    *dst = via;
                }
            }
        });
    }
}

impl PathMetrics {
    /// Reduce a solved distance matrix.
    ///
    /// The characteristic path length averages every finite entry,
    /// including the zero-length self pairs on the diagonal.
    pub fn from_distances(d: &[f64], n: usize) -> Self {
        let (inv_sum, finite_sum, finite_count) = d
            .par_chunks(n)
            .enumerate()
            .map(|(i, row)| {
                let mut inv = 0.0;
                let mut sum = 0.0;
                let mut count = 0usize;
                for (j, &v) in row.iter().enumerate() {
                    if i != j && v.abs() > f64::EPSILON {
                        inv += 1.0 / v;
                    }
                    if v.is_finite() {
                        sum += v;
                        count += 1;
                    }
                }
                (inv, sum, count)
            })
            .reduce(
                || (0.0, 0.0, 0usize),
                |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2),
            );

        let pairs = (n * n.saturating_sub(1)) as f64;
        Self {
            efficiency: if pairs > 0.0 { inv_sum / pairs } else { f64::NAN },
            characteristic_path_length: if finite_count > 0 {
                finite_sum / finite_count as f64
            } else {
                f64::NAN
            },
        }
    }
}

/// Weights → distances → blocked APSP → measures, in place over `c`.
pub fn pathlength(
    c: &mut [f64],
    n: usize,
    block_size: usize,
    frame: &mut Frame<'_>,
) -> ConnectomeResult<PathMetrics> {
    weights_to_distances(c, n);
    blocked_floyd_warshall(c, n, block_size, frame)?;
    Ok(PathMetrics::from_distances(c, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::testutil::{random_network, XorShift};
    use approx::assert_abs_diff_eq;

    fn random_distances(n: usize, seed: u64) -> Vec<f64> {
        let mut w = random_network(n, 0.15, seed);
        weights_to_distances(&mut w, n);
        w
    }

    fn assert_same_paths(a: &[f64], b: &[f64]) {
        for (idx, (x, y)) in a.iter().zip(b).enumerate() {
            if x.is_infinite() || y.is_infinite() {
                assert_eq!(x, y, "reachability differs at {idx}");
            } else {
                assert!((x - y).abs() <= 1e-9 * x.abs().max(1.0), "{x} != {y} at {idx}");
            }
        }
    }

    #[test]
    fn test_blocked_matches_naive() {
        for &n in &[1usize, 5, 127, 128, 129, 260] {
            let d = random_distances(n, 1000 + n as u64);
            let mut naive = d.clone();
            floyd_warshall(&mut naive, n);

            let mut blocked = d.clone();
            let mut arena = Arena::with_capacity(scratch_len(n, 128));
            blocked_floyd_warshall(&mut blocked, n, 128, &mut arena.frame()).unwrap();
            assert_same_paths(&blocked, &naive);
        }
    }

    #[test]
    fn test_blocked_small_blocks_many_tasks() {
        let n = 37;
        let d = random_distances(n, 42);
        let mut naive = d.clone();
        floyd_warshall(&mut naive, n);
        for &bs in &[1usize, 2, 5, 8, 36] {
            let mut blocked = d.clone();
            let mut arena = Arena::with_capacity(scratch_len(n, bs));
            blocked_floyd_warshall(&mut blocked, n, bs, &mut arena.frame()).unwrap();
            assert_same_paths(&blocked, &naive);
        }
    }

    #[test]
    fn test_task_graph_shape() {
        let g = TaskGraph::build(3);
        assert_eq!(g.tasks.len(), 27);
        let roots: Vec<usize> = g.roots().collect();
        assert_eq!(roots, vec![0]);
        // Diagonal(1) must wait for Interior(1,1,k=0)
        let diag1 = g
            .tasks
            .iter()
            .position(|t| *t == BlockTask::Diagonal { k: 1 })
            .unwrap();
        let int11 = g
            .tasks
            .iter()
            .position(|t| *t == BlockTask::Interior { i: 1, j: 1, k: 0 })
            .unwrap();
        assert!(g.successors[int11].contains(&diag1));
        // Every non-root task has at least one predecessor
        assert!(g.indegree[1..].iter().all(|&d| d > 0));
    }

    #[test]
    fn test_task_graph_war_edge() {
        let g = TaskGraph::build(2);
        let find = |t: BlockTask| g.tasks.iter().position(|x| *x == t).unwrap();
        // (0,1) is read by Interior(1,1,0), then rewritten by Column(0,1)
        let reader = find(BlockTask::Interior { i: 1, j: 1, k: 0 });
        let writer = find(BlockTask::Column { i: 0, k: 1 });
        assert!(g.successors[reader].contains(&writer));
    }

    #[test]
    fn test_arena_is_rewound() {
        let n = 10;
        let mut d = random_distances(n, 3);
        let mut arena = Arena::with_capacity(scratch_len(n, 4));
        let mut frame = arena.frame();
        blocked_floyd_warshall(&mut d, n, 4, &mut frame).unwrap();
        assert_eq!(scratch_len(n, 4), 144);
        assert_eq!(frame.available(), 144);
    }

    #[test]
    fn test_arena_too_small() {
        let n = 10;
        let mut d = random_distances(n, 3);
        let mut arena = Arena::with_capacity(50);
        assert!(blocked_floyd_warshall(&mut d, n, 4, &mut arena.frame()).is_err());
    }

    #[test]
    fn test_weights_to_distances() {
        let mut c = vec![5.0, 0.5, 0.0, 0.5, 5.0, -0.25, 0.0, -0.25, 5.0];
        weights_to_distances(&mut c, 3);
        assert_eq!(c[0], 0.0);
        assert_eq!(c[1], 2.0);
        assert_eq!(c[2], f64::INFINITY);
        assert_eq!(c[5], -4.0);
    }

    #[test]
    fn test_four_cycle_metrics() {
        // 0-1-2-3-0 with unit weights
        let n = 4;
        let mut c = vec![0.0; 16];
        for i in 0..n {
            let j = (i + 1) % n;
            c[i * n + j] = 1.0;
            c[j * n + i] = 1.0;
        }
        let mut arena = Arena::with_capacity(scratch_len(n, 128));
        let m = pathlength(&mut c, n, 128, &mut arena.frame()).unwrap();
        // ordered pairs: 8 at distance 1, 4 at distance 2, 4 self pairs
        assert_abs_diff_eq!(m.characteristic_path_length, 16.0 / 16.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.efficiency, (8.0 + 4.0 * 0.5) / 12.0, epsilon = 1e-12);
    }

    #[test]
    fn test_disconnected_network() {
        let n = 5;
        let mut c = vec![0.0; n * n];
        let mut arena = Arena::with_capacity(scratch_len(n, 128));
        let m = pathlength(&mut c, n, 128, &mut arena.frame()).unwrap();
        assert_eq!(m.efficiency, 0.0);
        assert_eq!(m.characteristic_path_length, 0.0);
    }

    #[test]
    fn test_single_node() {
        let mut c = vec![0.0];
        let mut arena = Arena::with_capacity(1);
        let m = pathlength(&mut c, 1, 128, &mut arena.frame()).unwrap();
        assert!(m.efficiency.is_nan());
        assert_eq!(m.characteristic_path_length, 0.0);
    }

    #[test]
    fn test_metrics_invariant_under_relabeling() {
        let n = 40;
        let w = random_network(n, 0.2, 77);
        let mut rng = XorShift::new(5);
        let mut perm: Vec<usize> = (0..n).collect();
        for i in (1..n).rev() {
            let j = (rng.next_u64() % (i as u64 + 1)) as usize;
            perm.swap(i, j);
        }
        let mut permuted = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                permuted[perm[i] * n + perm[j]] = w[i * n + j];
            }
        }

        let mut arena = Arena::with_capacity(scratch_len(n, 16));
        let mut a = w.clone();
        let ma = pathlength(&mut a, n, 16, &mut arena.frame()).unwrap();
        let mut b = permuted;
        let mb = pathlength(&mut b, n, 16, &mut arena.frame()).unwrap();
        assert_abs_diff_eq!(ma.efficiency, mb.efficiency, epsilon = 1e-10);
        assert_abs_diff_eq!(
            ma.characteristic_path_length,
            mb.characteristic_path_length,
            epsilon = 1e-10
        );
    }
}
