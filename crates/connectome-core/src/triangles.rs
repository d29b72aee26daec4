// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Triangle Engine
// ─────────────────────────────────────────────────────────────────────
//! Weighted clustering coefficient from cube-root-scaled weights.
//!
//! With `C = ∛W` (signed, zero diagonal) the weighted triangle count of
//! node `i` is `f_i = Σ_j C_ij (C·C)_ij`. Dividing by the `k_i(k_i − 1)`
//! ordered neighbour pairs gives the local coefficient.

use rayon::prelude::*;

use connectome_types::ConnectomeResult;

use crate::arena::Frame;

/// Clustering coefficient of one network.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringMetrics {
    /// Sum of the defined local coefficients divided by the node count.
    pub global: f64,
    /// Per node; `None` where the node has no neighbours or no triangles.
    pub local: Vec<Option<f64>>,
}

/// Scratch values [`clustering`] draws from the arena.
pub fn scratch_len(n: usize) -> usize {
    n * n
}

/// Compute clustering in place; `c` is overwritten with `∛c`.
///
/// Scratch: `n²` values from `frame` for the symmetric product.
pub fn clustering(
    c: &mut [f64],
    n: usize,
    frame: &mut Frame<'_>,
) -> ConnectomeResult<ClusteringMetrics> {
    if n == 0 {
        return Ok(ClusteringMetrics {
            global: f64::NAN,
            local: Vec::new(),
        });
    }

    c.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        for (j, v) in row.iter_mut().enumerate() {
            *v = if i == j { 0.0 } else { v.cbrt() };
        }
    });

    let local = frame.scope(|sub| -> ConnectomeResult<Vec<Option<f64>>> {
        let v = sub.alloc(n * n)?;
        symmetric_square(c, v, n);

        Ok(c.par_chunks(n)
            .zip(v.par_chunks(n))
            .map(|(ci, vi)| {
                let f: f64 = ci.iter().zip(vi).map(|(a, b)| a * b).sum();
                let k = ci.iter().filter(|w| w.abs() > f64::EPSILON).count();
                if k > 0 && f.abs() > f64::EPSILON {
                    Some(f / (k * (k - 1)) as f64)
                } else {
                    None
                }
            })
            .collect())
    })?;

    let global = local.iter().flatten().sum::<f64>() / n as f64;
    Ok(ClusteringMetrics { global, local })
}

/// `v = c·c` for symmetric `c`: lower triangle row-parallel, then mirrored.
fn symmetric_square(c: &[f64], v: &mut [f64], n: usize) {
    v.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        let ci = &c[i * n..(i + 1) * n];
        for (j, cell) in row.iter_mut().enumerate().take(i + 1) {
            let cj = &c[j * n..(j + 1) * n];
            *cell = ci.iter().zip(cj).map(|(a, b)| a * b).sum();
        }
    });
    for i in 0..n {
        for j in (i + 1)..n {
            v[i * n + j] = v[j * n + i];
        }
    }
}
