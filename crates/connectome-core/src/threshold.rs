// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Order-Statistic Thresholder
// ─────────────────────────────────────────────────────────────────────
//! Resolve proportional thresholds to absolute cutoffs and apply cutoffs.
//!
//! All proportional thresholds of one network share a single parallel
//! sort of its `n²` weights. The resulting [`ThresholdPlan`] lists the
//! thresholds in ascending cutoff order so they can be applied to one
//! working matrix progressively: zeroing below `t₂ ≥ t₁` after zeroing
//! below `t₁` gives the same matrix as zeroing below `t₂` directly.

use rayon::prelude::*;

use connectome_types::ThresholdSpec;

/// Sort `scratch` ascending and read one cutoff per proportion.
///
/// For a proportion `p` over `len = n²` weights the cutoff is the sorted
/// value at `len − round(p·len)`, clamped into `[0, len − 1]`, so roughly
/// the top `p` fraction of weights lies at or above it.
pub fn convert_proportional(scratch: &mut [f64], proportions: &[f64]) -> Vec<f64> {
    if proportions.is_empty() || scratch.is_empty() {
        return vec![f64::NAN; proportions.len()];
    }
    scratch.par_sort_unstable_by(f64::total_cmp);

    let len = scratch.len();
    proportions
        .iter()
        .map(|&p| {
            let keep = (p * len as f64).round().max(0.0) as usize;
            let idx = len.saturating_sub(keep).min(len - 1);
            scratch[idx]
        })
        .collect()
}

/// Zero every entry strictly below `cutoff`.
pub fn apply_absolute(matrix: &mut [f64], cutoff: f64) {
    matrix.par_iter_mut().for_each(|v| {
        if *v < cutoff {
            *v = 0.0;
        }
    });
}

/// Absolute cutoffs for one network, plus the order to apply them in.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdPlan {
    cutoffs: Vec<f64>,
    order: Vec<usize>,
}

impl ThresholdPlan {
    /// Resolve `thresholds` against `network`.
    ///
    /// `scratch` must hold `network.len()` values; it is overwritten only
    /// when at least one threshold is proportional.
    pub fn build(network: &[f64], thresholds: &[ThresholdSpec], scratch: &mut [f64]) -> Self {
        let proportions: Vec<f64> = thresholds
            .iter()
            .filter(|t| t.is_proportional())
            .map(|t| t.value())
            .collect();

        let converted = if proportions.is_empty() {
            Vec::new()
        } else {
            scratch.copy_from_slice(network);
            convert_proportional(scratch, &proportions)
        };

        let mut next = converted.into_iter();
        let cutoffs: Vec<f64> = thresholds
            .iter()
            .map(|t| match *t {
                ThresholdSpec::Absolute(v) => v,
                ThresholdSpec::Proportional(_) => next.next().unwrap_or(f64::NAN),
                ThresholdSpec::NonNegativeProportional(_) => {
                    next.next().map_or(f64::NAN, |c| c.max(0.0))
                }
            })
            .collect();

        let mut order: Vec<usize> = (0..cutoffs.len()).collect();
        order.sort_by(|&a, &b| cutoffs[a].total_cmp(&cutoffs[b]));

        Self { cutoffs, order }
    }

    pub fn len(&self) -> usize {
        self.cutoffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cutoffs.is_empty()
    }

    /// `(threshold_index, cutoff)` in ascending cutoff order; ties keep
    /// request order.
    pub fn steps(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.order.iter().map(move |&i| (i, self.cutoffs[i]))
    }
}
