// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Types
// License: GNU LGPL v3 or later
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Grid specification, configuration, result tensor, and error
//! hierarchy shared by the connectome kernel and its command-line front end.

pub mod config;
pub mod error;
pub mod result;
pub mod spec;

pub use config::GridConfig;
pub use error::{ConnectomeError, ConnectomeResult};
pub use result::{ColumnLabel, ResultTensor};
pub use spec::{
    Dimensionality, GridSpec, MeasureKind, MeasureSpec, NetworkDefinition, ThresholdSpec,
};
