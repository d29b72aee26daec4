// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Network Construction
// ─────────────────────────────────────────────────────────────────────
//! Turn a centered sample matrix into a dense weighted network.
//!
//! Two constructions are supported:
//!
//! - **Correlation**: sample covariance normalized to unit variance.
//! - **Ridge partial correlation**: the negated inverse of the
//!   ridge-regularized (scaled) covariance, normalized the same way.
//!
//! Every builder writes an `n × n` row-major matrix that is symmetric with
//! a zero diagonal.

use rayon::prelude::*;

use connectome_types::{ConnectomeError, ConnectomeResult, NetworkDefinition};

use crate::arena::Frame;
use crate::linalg;

/// Dense `nodes × samples` time series, centered per node.
#[derive(Debug, Clone)]
pub struct SampleMatrix {
    data: Vec<f64>,
    nodes: usize,
    samples: usize,
}

impl SampleMatrix {
    /// Build from a row-major `samples × nodes` buffer (one row per sample).
    pub fn from_samples_by_nodes(
        data: &[f64],
        samples: usize,
        nodes: usize,
    ) -> ConnectomeResult<Self> {
        Self::check_shape(data.len(), samples, nodes)?;
        let mut out = vec![0.0; data.len()];
        for s in 0..samples {
            for v in 0..nodes {
                out[v * samples + s] = data[s * nodes + v];
            }
        }
        Ok(Self::centered(out, nodes, samples))
    }

    /// Take a row-major `nodes × samples` buffer as-is.
    pub fn from_nodes_by_samples(
        data: Vec<f64>,
        nodes: usize,
        samples: usize,
    ) -> ConnectomeResult<Self> {
        Self::check_shape(data.len(), samples, nodes)?;
        Ok(Self::centered(data, nodes, samples))
    }

    fn check_shape(len: usize, samples: usize, nodes: usize) -> ConnectomeResult<()> {
        if nodes == 0 {
            return Err(ConnectomeError::Input("sample matrix has no nodes".to_string()));
        }
        if samples < 2 {
            return Err(ConnectomeError::Input(format!(
                "at least 2 samples are required, got {samples}"
            )));
        }
        if len != samples * nodes {
            return Err(ConnectomeError::Input(format!(
                "data length {len} does not match {samples} samples × {nodes} nodes"
            )));
        }
        Ok(())
    }

    fn centered(mut data: Vec<f64>, nodes: usize, samples: usize) -> Self {
        data.par_chunks_mut(samples).for_each(|row| {
            let mean = row.iter().sum::<f64>() / samples as f64;
            row.iter_mut().for_each(|v| *v -= mean);
        });
        let flat = data
            .chunks(samples)
            .filter(|row| row.iter().all(|v| v.abs() <= f64::EPSILON))
            .count();
        if flat > 0 {
            log::warn!("{flat} of {nodes} nodes have a constant time series");
        }
        Self {
            data,
            nodes,
            samples,
        }
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Centered series of node `i`.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.samples..(i + 1) * self.samples]
    }
}

/// `C = X·Xᵗ / (samples − 1)`. The lower triangle is computed row-parallel
/// and mirrored.
pub fn covariance(samples: &SampleMatrix, out: &mut [f64]) {
    let n = samples.nodes();
    debug_assert_eq!(out.len(), n * n);
    let alpha = 1.0 / (samples.samples() - 1) as f64;

    out.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        let xi = samples.row(i);
        for (j, cell) in row.iter_mut().enumerate().take(i + 1) {
            let dot: f64 = xi.iter().zip(samples.row(j)).map(|(a, b)| a * b).sum();
            *cell = alpha * dot;
        }
    });

    for i in 0..n {
        for j in (i + 1)..n {
            out[i * n + j] = out[j * n + i];
        }
    }
}

/// Normalize a covariance-like matrix in place to unit diagonal scale and
/// zero the diagonal.
///
/// Each node's factor is `1 / sqrt(|c_ii|)`, or `1` when the diagonal is
/// negligible.
pub fn cov2corr(c: &mut [f64], n: usize) {
    let d: Vec<f64> = (0..n)
        .map(|i| {
            let v = c[i * n + i].abs();
            if v > f64::EPSILON {
                1.0 / v.sqrt()
            } else {
                1.0
            }
        })
        .collect();

    c.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        for (j, cell) in row.iter_mut().enumerate() {
            if i == j {
                *cell = 0.0;
            } else {
                *cell *= d[i] * d[j];
            }
        }
    });
}

/// Pearson correlation network.
pub fn build_correlation(samples: &SampleMatrix, out: &mut [f64]) {
    covariance(samples, out);
    cov2corr(out, samples.nodes());
}

/// Ridge-regularized partial correlation network.
///
/// Scratch: `2 n²` values from `frame`.
pub fn build_ridge(
    samples: &SampleMatrix,
    rho: f64,
    out: &mut [f64],
    frame: &mut Frame<'_>,
) -> ConnectomeResult<()> {
    let n = samples.nodes();
    covariance(samples, out);

    let mean_sq = (0..n).map(|i| out[i * n + i].powi(2)).sum::<f64>() / n as f64;
    if mean_sq <= f64::EPSILON {
        return Err(ConnectomeError::Numerical(
            "ridge network: covariance diagonal is zero".to_string(),
        ));
    }
    let scale = 1.0 / mean_sq.sqrt();

    frame.scope(|sub| -> ConnectomeResult<()> {
        let a = sub.alloc(n * n)?;
        let work = sub.alloc(n * n)?;
        for (dst, src) in a.iter_mut().zip(out.iter()) {
            *dst = src * scale;
        }
        for i in 0..n {
            a[i * n + i] += rho;
        }
        linalg::invert_into(a, work, n).map_err(|e| match e {
            ConnectomeError::Numerical(msg) => {
                ConnectomeError::Numerical(format!("ridge network (rho = {rho}): {msg}"))
            }
            other => other,
        })?;
        for (dst, src) in out.iter_mut().zip(a.iter()) {
            *dst = -src;
        }
        Ok(())
    })?;

    cov2corr(out, n);
    Ok(())
}

/// Build the network named by `definition` into `out`.
pub fn build_network(
    definition: &NetworkDefinition,
    samples: &SampleMatrix,
    out: &mut [f64],
    frame: &mut Frame<'_>,
) -> ConnectomeResult<()> {
    match *definition {
        NetworkDefinition::Correlation => {
            build_correlation(samples, out);
            Ok(())
        }
        NetworkDefinition::Ridge { rho } => build_ridge(samples, rho, out, frame),
    }
}

/// Scratch values [`build_network`] draws from the arena for `n` nodes.
pub fn scratch_len(definition: &NetworkDefinition, n: usize) -> usize {
    match definition {
        NetworkDefinition::Correlation => 0,
        NetworkDefinition::Ridge { .. } => 2 * n * n,
    }
}

/// Fisher z-transform, elementwise `atanh`.
///
/// Library utility for callers post-processing correlation networks; the
/// grid reports measures on the untransformed weights and never calls it.
pub fn corr2z(c: &mut [f64]) {
    c.par_iter_mut().for_each(|v| *v = v.atanh());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::testutil::{duplicated_node_samples, random_samples};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_shape_errors() {
        assert!(matches!(
            SampleMatrix::from_samples_by_nodes(&[1.0, 2.0], 1, 2),
            Err(ConnectomeError::Input(_))
        ));
        assert!(SampleMatrix::from_samples_by_nodes(&[], 4, 0).is_err());
        assert!(SampleMatrix::from_samples_by_nodes(&[1.0; 5], 3, 2).is_err());
    }

    #[test]
    fn test_centering_and_transpose() {
        // 3 samples × 2 nodes
        let data = [1.0, 10.0, 2.0, 20.0, 3.0, 30.0];
        let s = SampleMatrix::from_samples_by_nodes(&data, 3, 2).unwrap();
        assert_eq!(s.row(0), &[-1.0, 0.0, 1.0]);
        assert_eq!(s.row(1), &[-10.0, 0.0, 10.0]);
    }

    #[test]
    fn test_correlation_symmetric_zero_diagonal() {
        for &(samples, nodes) in &[(6, 4), (30, 17), (5, 40)] {
            let s = random_samples(samples, nodes, 7 + nodes as u64);
            let mut c = vec![0.0; nodes * nodes];
            build_correlation(&s, &mut c);
            for i in 0..nodes {
                assert_eq!(c[i * nodes + i], 0.0);
                for j in 0..nodes {
                    assert_eq!(c[i * nodes + j], c[j * nodes + i], "asymmetric at ({i},{j})");
                    assert!(c[i * nodes + j].abs() <= 1.0 + 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_perfectly_correlated_pair() {
        let data = [1.0, 2.0, -1.0, 2.0, 4.0, -2.0, 3.0, 6.0, -3.0];
        let s = SampleMatrix::from_samples_by_nodes(&data, 3, 3).unwrap();
        let mut c = vec![0.0; 9];
        build_correlation(&s, &mut c);
        assert_abs_diff_eq!(c[1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c[2], -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c[5], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_node_gives_zero_row() {
        let data = [1.0, 5.0, 2.0, 5.0, 4.0, 5.0];
        let s = SampleMatrix::from_samples_by_nodes(&data, 3, 2).unwrap();
        let mut c = vec![0.0; 4];
        build_correlation(&s, &mut c);
        assert_eq!(c, vec![0.0; 4]);
    }

    #[test]
    fn test_ridge_symmetric_zero_diagonal() {
        let n = 12;
        let s = random_samples(40, n, 99);
        let mut arena = Arena::with_capacity(2 * n * n);
        let mut frame = arena.frame();
        let mut c = vec![0.0; n * n];
        build_ridge(&s, 0.5, &mut c, &mut frame).unwrap();
        for i in 0..n {
            assert_eq!(c[i * n + i], 0.0);
            for j in 0..n {
                assert_abs_diff_eq!(c[i * n + j], c[j * n + i], epsilon = 1e-10);
                assert!(c[i * n + j].is_finite());
            }
        }
        assert_eq!(frame.available(), 2 * n * n);
    }

    #[test]
    fn test_ridge_matches_partial_correlation_sign() {
        // Node 2 is driven by nodes 0 and 1; partial correlations with it
        // stay positive under mild regularization.
        let base = random_samples(200, 2, 5);
        let mut data = Vec::with_capacity(600);
        for s in 0..200 {
            let a = base.row(0)[s];
            let b = base.row(1)[s];
            data.extend_from_slice(&[a, b, a + b]);
        }
        let s = SampleMatrix::from_samples_by_nodes(&data, 200, 3).unwrap();
        let mut arena = Arena::with_capacity(18);
        let mut c = vec![0.0; 9];
        build_ridge(&s, 0.1, &mut c, &mut arena.frame()).unwrap();
        assert!(c[2] > 0.0, "partial(0,2) = {}", c[2]);
        assert!(c[5] > 0.0, "partial(1,2) = {}", c[5]);
    }

    #[test]
    fn test_ridge_singular_without_regularization() {
        let n = 6;
        let s = duplicated_node_samples(30, n, 8);
        let mut arena = Arena::with_capacity(2 * n * n);
        let mut c = vec![0.0; n * n];
        match build_ridge(&s, 0.0, &mut c, &mut arena.frame()) {
            Err(ConnectomeError::Numerical(msg)) => assert!(msg.contains("rho = 0"), "{msg}"),
            other => panic!("expected Numerical error, got {other:?}"),
        }
        // any positive rho makes the same system solvable
        build_ridge(&s, 0.5, &mut c, &mut arena.frame()).unwrap();
        assert!(c.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_ridge_arena_too_small() {
        let n = 6;
        let s = random_samples(20, n, 3);
        let mut arena = Arena::with_capacity(n * n);
        let mut c = vec![0.0; n * n];
        let err = build_ridge(&s, 1.0, &mut c, &mut arena.frame()).unwrap_err();
        assert!(matches!(err, ConnectomeError::ArenaExhausted { .. }));
    }

    #[test]
    fn test_build_network_dispatch() {
        let n = 5;
        let s = random_samples(12, n, 11);
        let mut arena = Arena::with_capacity(scratch_len(&NetworkDefinition::Ridge { rho: 1.0 }, n));
        let mut frame = arena.frame();
        let mut a = vec![0.0; n * n];
        let mut b = vec![0.0; n * n];
        build_network(&NetworkDefinition::Correlation, &s, &mut a, &mut frame).unwrap();
        build_correlation(&s, &mut b);
        assert_eq!(a, b);
        build_network(&NetworkDefinition::Ridge { rho: 1.0 }, &s, &mut a, &mut frame).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_corr2z() {
        let mut c = vec![0.0, 0.5, -0.5, 0.0];
        corr2z(&mut c);
        assert_abs_diff_eq!(c[1], 0.5f64.atanh(), epsilon = 1e-15);
        assert_abs_diff_eq!(c[2], -(0.5f64.atanh()), epsilon = 1e-15);
        assert_eq!(c[0], 0.0);
    }
}
