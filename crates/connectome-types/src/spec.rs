// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Grid Specification
// ─────────────────────────────────────────────────────────────────────
//! The three axes of the parameter grid and their string forms.
//!
//! | Axis | Tokens |
//! | :-- | :-- |
//! | Network definition | `corr`, `ridge`, `ridge:<rho>` |
//! | Threshold | `absolute:<v>`, `proportional:<v>`, `nnegproportional:<v>`, or `<kind>:<low>:<step>:<high>` |
//! | Measure | `global:charpath`, `global:clustering_coef`, `global:efficiency` (plus `local:` forms) |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConnectomeError, ConnectomeResult};

/// Ranges that would expand beyond this many thresholds are rejected.
const MAX_RANGE_STEPS: usize = 1_000_000;

fn parse_value(token: &str, field: &str, full: &str) -> ConnectomeResult<f64> {
    let v: f64 = token.trim().parse().map_err(|_| {
        ConnectomeError::Config(format!("invalid {field} '{token}' in '{full}'"))
    })?;
    if !v.is_finite() {
        return Err(ConnectomeError::Config(format!(
            "{field} must be finite in '{full}'"
        )));
    }
    Ok(v)
}

// ─────────────────────────────────────────────────────────────────────────────
// Network definitions
// ─────────────────────────────────────────────────────────────────────────────

/// How a network is constructed from the sample matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NetworkDefinition {
    /// Pearson correlation.
    Correlation,
    /// Ridge-regularized partial correlation.
    Ridge { rho: f64 },
}

impl NetworkDefinition {
    pub const DEFAULT_RHO: f64 = 1.0;

    pub fn label(&self) -> String {
        match self {
            NetworkDefinition::Correlation => "corr".to_string(),
            NetworkDefinition::Ridge { rho } => format!("ridge:{rho:.6}"),
        }
    }
}

impl FromStr for NetworkDefinition {
    type Err = ConnectomeError;

    fn from_str(s: &str) -> ConnectomeResult<Self> {
        let mut parts = s.split(':');
        let head = parts.next().unwrap_or_default();
        let param = parts.next();
        if parts.next().is_some() {
            return Err(ConnectomeError::Config(format!(
                "undefined network definition scheme {s}"
            )));
        }
        match (head, param) {
            ("corr", None) => Ok(NetworkDefinition::Correlation),
            ("corr", Some(_)) => Err(ConnectomeError::Config(format!(
                "network definition scheme corr takes no parameter: {s}"
            ))),
            ("ridge", None) => Ok(NetworkDefinition::Ridge {
                rho: Self::DEFAULT_RHO,
            }),
            ("ridge", Some(p)) => Ok(NetworkDefinition::Ridge {
                rho: parse_value(p, "ridge parameter", s)?,
            }),
            _ => Err(ConnectomeError::Config(format!(
                "undefined network definition scheme {s}"
            ))),
        }
    }
}

impl fmt::Display for NetworkDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Thresholds
// ─────────────────────────────────────────────────────────────────────────────

/// How a network is thresholded before measures are computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ThresholdSpec {
    /// Keep every weight `>= value`.
    Absolute(f64),
    /// Keep the strongest `value` fraction of weights.
    Proportional(f64),
    /// As `Proportional`, but the resulting cutoff never drops below zero.
    NonNegativeProportional(f64),
}

impl ThresholdSpec {
    fn with_value(kind: &str, value: f64) -> Option<Self> {
        match kind {
            "absolute" => Some(ThresholdSpec::Absolute(value)),
            "proportional" => Some(ThresholdSpec::Proportional(value)),
            "nnegproportional" => Some(ThresholdSpec::NonNegativeProportional(value)),
            _ => None,
        }
    }

    /// The user-supplied parameter (cutoff or proportion).
    pub fn value(&self) -> f64 {
        match *self {
            ThresholdSpec::Absolute(v)
            | ThresholdSpec::Proportional(v)
            | ThresholdSpec::NonNegativeProportional(v) => v,
        }
    }

    /// True for both proportional variants.
    pub fn is_proportional(&self) -> bool {
        !matches!(self, ThresholdSpec::Absolute(_))
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            ThresholdSpec::Absolute(_) => "absolute",
            ThresholdSpec::Proportional(_) => "proportional",
            ThresholdSpec::NonNegativeProportional(_) => "nnegproportional",
        }
    }

    pub fn label(&self) -> String {
        format!("{}:{:.6}", self.kind_str(), self.value())
    }

    /// Parse a threshold token, expanding `kind:low:step:high` ranges.
    ///
    /// A range yields `low + i * step` for every `i` whose value stays below
    /// `high + step / 2`, so `high` itself is included despite rounding.
    pub fn parse_many(s: &str) -> ConnectomeResult<Vec<Self>> {
        let undefined = || ConnectomeError::Config(format!("undefined threshold {s}"));

        let parts: Vec<&str> = s.split(':').collect();
        let kind = parts[0];
        Self::with_value(kind, 0.0).ok_or_else(undefined)?;

        match parts.len() {
            2 => {
                let v = parse_value(parts[1], "threshold value", s)?;
                Ok(vec![Self::with_value(kind, v).ok_or_else(undefined)?])
            }
            4 => {
                let low = parse_value(parts[1], "range start", s)?;
                let step = parse_value(parts[2], "range step", s)?;
                let high = parse_value(parts[3], "range end", s)?;
                if step <= 0.0 {
                    return Err(ConnectomeError::Config(format!(
                        "range step must be > 0 in {s}"
                    )));
                }
                let bound = high + 0.5 * step;
                let mut out = Vec::new();
                let mut i = 0usize;
                loop {
                    let v = low + i as f64 * step;
                    if v >= bound {
                        break;
                    }
                    if out.len() == MAX_RANGE_STEPS {
                        return Err(ConnectomeError::Config(format!(
                            "threshold range {s} expands beyond {MAX_RANGE_STEPS} values"
                        )));
                    }
                    out.push(Self::with_value(kind, v).ok_or_else(undefined)?);
                    i += 1;
                }
                if out.is_empty() {
                    return Err(ConnectomeError::Config(format!(
                        "threshold range {s} is empty"
                    )));
                }
                log::debug!("threshold range {s} expanded to {} values", out.len());
                Ok(out)
            }
            // kind:low:step with no upper bound, or a bare kind
            _ => Err(undefined()),
        }
    }
}

impl fmt::Display for ThresholdSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Measures
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimensionality {
    /// One scalar per network.
    Global,
    /// One value per node.
    Local,
}

impl Dimensionality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimensionality::Global => "global",
            Dimensionality::Local => "local",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasureKind {
    CharacteristicPathLength,
    ClusteringCoefficient,
    Efficiency,
}

impl MeasureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureKind::CharacteristicPathLength => "charpath",
            MeasureKind::ClusteringCoefficient => "clustering_coef",
            MeasureKind::Efficiency => "efficiency",
        }
    }

    /// Whether the measure needs the all-pairs shortest-path solver.
    pub fn needs_paths(&self) -> bool {
        !matches!(self, MeasureKind::ClusteringCoefficient)
    }
}

/// A requested network property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeasureSpec {
    pub dimensionality: Dimensionality,
    pub kind: MeasureKind,
}

impl MeasureSpec {
    pub fn global(kind: MeasureKind) -> Self {
        Self {
            dimensionality: Dimensionality::Global,
            kind,
        }
    }

    pub fn label(&self) -> String {
        format!("{}:{}", self.dimensionality.as_str(), self.kind.as_str())
    }
}

impl FromStr for MeasureSpec {
    type Err = ConnectomeError;

    fn from_str(s: &str) -> ConnectomeResult<Self> {
        let undefined = || ConnectomeError::Config(format!("undefined measure {s}"));
        let (dim, kind) = s.split_once(':').ok_or_else(undefined)?;
        let dimensionality = match dim {
            "global" => Dimensionality::Global,
            "local" => Dimensionality::Local,
            _ => return Err(undefined()),
        };
        let kind = match kind {
            "charpath" => MeasureKind::CharacteristicPathLength,
            "clustering_coef" => MeasureKind::ClusteringCoefficient,
            "efficiency" => MeasureKind::Efficiency,
            _ => return Err(undefined()),
        };
        Ok(Self {
            dimensionality,
            kind,
        })
    }
}

impl fmt::Display for MeasureSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Grid
// ─────────────────────────────────────────────────────────────────────────────

/// Full parameter grid: definitions × thresholds × measures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub definitions: Vec<NetworkDefinition>,
    /// Already range-expanded.
    pub thresholds: Vec<ThresholdSpec>,
    pub measures: Vec<MeasureSpec>,
}

impl GridSpec {
    /// Build a grid from raw tokens, failing on the first bad token.
    pub fn parse<S: AsRef<str>>(
        definitions: &[S],
        thresholds: &[S],
        measures: &[S],
    ) -> ConnectomeResult<Self> {
        let definitions = definitions
            .iter()
            .map(|d| d.as_ref().parse())
            .collect::<ConnectomeResult<Vec<_>>>()?;
        let mut expanded = Vec::new();
        for t in thresholds {
            expanded.extend(ThresholdSpec::parse_many(t.as_ref())?);
        }
        let measures = measures
            .iter()
            .map(|m| m.as_ref().parse())
            .collect::<ConnectomeResult<Vec<_>>>()?;
        Ok(Self {
            definitions,
            thresholds: expanded,
            measures,
        })
    }

    /// Reject empty axes and local measures.
    pub fn validate(&self) -> ConnectomeResult<()> {
        if self.definitions.is_empty() {
            return Err(ConnectomeError::Config(
                "at least one network definition is required".to_string(),
            ));
        }
        if self.thresholds.is_empty() {
            return Err(ConnectomeError::Config(
                "at least one threshold is required".to_string(),
            ));
        }
        if self.measures.is_empty() {
            return Err(ConnectomeError::Config(
                "at least one measure is required".to_string(),
            ));
        }
        if let Some(m) = self
            .measures
            .iter()
            .find(|m| m.dimensionality == Dimensionality::Local)
        {
            return Err(ConnectomeError::Unsupported(format!(
                "local measures are not implemented: {}",
                m.label()
            )));
        }
        for d in &self.definitions {
            if let NetworkDefinition::Ridge { rho } = d {
                if !rho.is_finite() {
                    return Err(ConnectomeError::Config(format!(
                        "ridge parameter must be finite, got {rho}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Global measures in request order.
    pub fn global_measures(&self) -> impl Iterator<Item = &MeasureSpec> {
        self.measures
            .iter()
            .filter(|m| m.dimensionality == Dimensionality::Global)
    }

    /// Local measures in request order.
    pub fn local_measures(&self) -> impl Iterator<Item = &MeasureSpec> {
        self.measures
            .iter()
            .filter(|m| m.dimensionality == Dimensionality::Local)
    }
}
