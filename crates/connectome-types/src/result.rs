// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Result Tensor
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::spec::GridSpec;

/// Labels identifying one (definition × threshold) column of the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLabel {
    pub definition: String,
    pub threshold: String,
}

/// Dense result arrays for a grid run.
///
/// Every cell starts as NaN so cells that were never computed stay
/// distinguishable from computed zeros.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultTensor {
    pub n_definitions: usize,
    pub n_thresholds: usize,
    pub n_global: usize,
    pub n_local: usize,
    pub n_nodes: usize,
    /// `[definitions × thresholds × global measures]`, row-major.
    pub global: Vec<f64>,
    /// `[definitions × thresholds × local measures × nodes]`, row-major.
    pub local: Vec<f64>,
}

impl ResultTensor {
    pub fn new(
        n_definitions: usize,
        n_thresholds: usize,
        n_global: usize,
        n_local: usize,
        n_nodes: usize,
    ) -> Self {
        Self {
            n_definitions,
            n_thresholds,
            n_global,
            n_local,
            n_nodes,
            global: vec![f64::NAN; n_definitions * n_thresholds * n_global],
            local: vec![f64::NAN; n_definitions * n_thresholds * n_local * n_nodes],
        }
    }

    /// Allocate a tensor shaped for `spec` over `n_nodes` nodes.
    pub fn for_grid(spec: &GridSpec, n_nodes: usize) -> Self {
        Self::new(
            spec.definitions.len(),
            spec.thresholds.len(),
            spec.global_measures().count(),
            spec.local_measures().count(),
            n_nodes,
        )
    }

    #[inline]
    pub fn global_index(&self, definition: usize, threshold: usize, measure: usize) -> usize {
        (definition * self.n_thresholds + threshold) * self.n_global + measure
    }

    pub fn global(&self, definition: usize, threshold: usize, measure: usize) -> f64 {
        self.global[self.global_index(definition, threshold, measure)]
    }

    pub fn set_global(&mut self, definition: usize, threshold: usize, measure: usize, v: f64) {
        let i = self.global_index(definition, threshold, measure);
        self.global[i] = v;
    }

    /// Length of the contiguous slice owned by one definition.
    pub fn definition_stride(&self) -> usize {
        self.n_thresholds * self.n_global
    }

    /// Number of (definition × threshold) columns.
    pub fn n_columns(&self) -> usize {
        self.n_definitions * self.n_thresholds
    }

    /// Count of global cells still holding NaN.
    pub fn undefined_global_cells(&self) -> usize {
        self.global.iter().filter(|v| v.is_nan()).count()
    }
}

impl GridSpec {
    /// One label pair per (definition × threshold), definition-major.
    pub fn column_labels(&self) -> Vec<ColumnLabel> {
        let mut out = Vec::with_capacity(self.definitions.len() * self.thresholds.len());
        for d in &self.definitions {
            for t in &self.thresholds {
                out.push(ColumnLabel {
                    definition: d.label(),
                    threshold: t.label(),
                });
            }
        }
        out
    }

    /// One label per global measure, in request order.
    pub fn row_labels(&self) -> Vec<String> {
        self.global_measures().map(|m| m.label()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialized_to_nan() {
        let t = ResultTensor::new(2, 3, 2, 0, 5);
        assert_eq!(t.global.len(), 12);
        assert!(t.local.is_empty());
        assert_eq!(t.undefined_global_cells(), 12);
    }

    #[test]
    fn test_index_layout() {
        let mut t = ResultTensor::new(2, 3, 2, 0, 5);
        t.set_global(1, 2, 1, 0.5);
        assert_eq!(t.global_index(1, 2, 1), 11);
        assert_eq!(t.global(1, 2, 1), 0.5);
        assert_eq!(t.definition_stride(), 6);
        assert_eq!(t.undefined_global_cells(), 11);
    }

    #[test]
    fn test_labels() {
        let grid = GridSpec::parse(
            &["corr", "ridge:0.5"],
            &["absolute:0.2", "proportional:0.1"],
            &["global:charpath"],
        )
        .unwrap();
        let cols = grid.column_labels();
        assert_eq!(cols.len(), 4);
        assert_eq!(cols[0].definition, "corr");
        assert_eq!(cols[0].threshold, "absolute:0.200000");
        assert_eq!(cols[3].definition, "ridge:0.500000");
        assert_eq!(cols[3].threshold, "proportional:0.100000");
        assert_eq!(grid.row_labels(), vec!["global:charpath".to_string()]);
    }
}
