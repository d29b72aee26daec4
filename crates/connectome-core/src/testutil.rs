// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Test Helpers
// ─────────────────────────────────────────────────────────────────────

use crate::network::SampleMatrix;

/// Xorshift64 generator; deterministic across platforms.
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1)
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

pub fn random_samples(samples: usize, nodes: usize, seed: u64) -> SampleMatrix {
    let mut rng = XorShift::new(seed);
    let data: Vec<f64> = (0..samples * nodes).map(|_| rng.next_f64() * 2.0 - 1.0).collect();
    SampleMatrix::from_samples_by_nodes(&data, samples, nodes).unwrap()
}

/// Like [`random_samples`], but the last node repeats node 0 exactly, so
/// the covariance matrix is singular.
pub fn duplicated_node_samples(samples: usize, nodes: usize, seed: u64) -> SampleMatrix {
    let mut rng = XorShift::new(seed);
    let mut data: Vec<f64> = (0..samples * nodes).map(|_| rng.next_f64() * 2.0 - 1.0).collect();
    for row in data.chunks_mut(nodes) {
        row[nodes - 1] = row[0];
    }
    SampleMatrix::from_samples_by_nodes(&data, samples, nodes).unwrap()
}

/// Symmetric weight matrix with zero diagonal; roughly `density` of the
/// off-diagonal pairs carry a weight in `(0.05, 1]`.
pub fn random_network(n: usize, density: f64, seed: u64) -> Vec<f64> {
    let mut rng = XorShift::new(seed);
    let mut w = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            if rng.next_f64() < density {
                let v = 0.05 + 0.95 * rng.next_f64();
                w[i * n + j] = v;
                w[j * n + i] = v;
            }
        }
    }
    w
}
