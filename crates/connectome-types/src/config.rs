// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Runtime Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{ConnectomeError, ConnectomeResult};

/// Runtime configuration for a grid run.
///
/// Contains only execution knobs. What to compute lives in
/// [`GridSpec`](crate::spec::GridSpec).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Edge length of the square blocks used by the blocked shortest-path
    /// solver. Default: 128.
    pub block_size: usize,

    /// Worker threads for the grid pool. `None` uses every available core.
    pub threads: Option<usize>,

    /// Per-worker scratch arena in MiB. `None` sizes each arena to the
    /// exact need of the run.
    pub arena_mb: Option<usize>,

    /// Emit progress through the log facade.
    /// Default: true.
    pub progress: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            block_size: 128,
            threads: None,
            arena_mb: None,
            progress: true,
        }
    }
}

impl GridConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> ConnectomeResult<()> {
        if self.block_size == 0 {
            return Err(ConnectomeError::Config(
                "block_size must be > 0".to_string(),
            ));
        }
        if let Some(t) = self.threads {
            if t == 0 {
                return Err(ConnectomeError::Config(
                    "threads must be > 0 when set".to_string(),
                ));
            }
        }
        if let Some(mb) = self.arena_mb {
            if mb == 0 {
                return Err(ConnectomeError::Config(
                    "arena_mb must be > 0 when set".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Arena capacity in `f64` values, if configured.
    pub fn arena_values(&self) -> Option<usize> {
        self.arena_mb
            .map(|mb| mb * 1024 * 1024 / std::mem::size_of::<f64>())
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> ConnectomeResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ConnectomeError::Config(format!("JSON parse error: {e}")))
    }
}
