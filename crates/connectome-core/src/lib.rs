// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Core Engine
// License: GNU LGPL v3 or later
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Graph measures of brain connectivity networks over a parameter grid.
//!
//! A sample matrix (time points × regions) is turned into one dense
//! weighted network per network definition, thresholded once per
//! threshold rule, and reduced to global measures: characteristic path
//! length, global efficiency and clustering coefficient.
//!
//! # Invariants
//!
//! 1. **Networks are symmetric with a zero diagonal** after construction;
//!    thresholding only ever zeroes entries.
//!
//! 2. **One sort per network**: all proportional thresholds of a network
//!    are resolved from a single parallel sort of its weights.
//!
//! 3. **Ascending cutoffs**: thresholds of one network are applied to one
//!    working matrix in ascending order of their absolute cutoff, ties in
//!    request order.
//!
//! 4. **Private scratch**: every outer worker owns one [`Arena`]; all
//!    `n × n` scratch in the per-threshold loop comes from scoped frames
//!    of that arena.

pub mod arena;
pub mod grid;
pub mod linalg;
pub mod network;
pub mod pathlength;
pub mod progress;
pub mod threshold;
pub mod triangles;

#[cfg(test)]
mod testutil;

pub use arena::{Arena, Frame};
pub use grid::{evaluate_network, GridOutput, GridRunner};
pub use network::{build_network, corr2z, SampleMatrix};
pub use pathlength::{blocked_floyd_warshall, floyd_warshall, pathlength, PathMetrics};
pub use progress::Progress;
pub use threshold::{apply_absolute, convert_proportional, ThresholdPlan};
pub use triangles::{clustering, ClusteringMetrics};
