// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all connectome kernel failures.
///
/// Every variant is fatal for a run: the grid either completes in full or
/// aborts before any output is written.
#[derive(Error, Debug)]
pub enum ConnectomeError {
    /// Unknown network definition, threshold, or measure token, or a
    /// malformed range specification.
    #[error("config error: {0}")]
    Config(String),

    /// Sample matrix has the wrong shape or too few samples.
    #[error("input error: {0}")]
    Input(String),

    /// Singular or ill-conditioned linear system during ridge construction.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Scratch arena cannot satisfy an allocation.
    #[error(
        "arena exhausted: requested {requested} values with {available} of {capacity} free; \
         increase the arena size (--arena-mb or CONNECTOME_ARENA_MB)"
    )]
    ArenaExhausted {
        requested: usize,
        available: usize,
        capacity: usize,
    },

    /// Request is syntactically valid but not implemented.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ConnectomeError {
    fn from(e: std::io::Error) -> Self {
        ConnectomeError::Io(e.to_string())
    }
}

pub type ConnectomeResult<T> = Result<T, ConnectomeError>;
