//! Settings shared by the converters.
//!
//! [ConverterConfig] derives [serde::Deserialize] with a default for every field, so it can be
//! embedded as a section of a host application's configuration file.

use serde::{Deserialize, Serialize};

/// Maximum collection nesting accepted when no limit is configured.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Rounding applied to the x, y and z ordinates of every coordinate a
/// [GeometryFactory](crate::source::GeometryFactory) builds. Measures are never rounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrecisionModel {
    /// Full double precision
    #[default]
    Floating,
    /// Ordinates are snapped to a grid of `1 / scale`
    Fixed { scale: f64 },
}

impl PrecisionModel {
    pub fn make_precise(&self, value: f64) -> f64 {
        match *self {
            PrecisionModel::Floating => value,
            PrecisionModel::Fixed { scale } if scale > 0.0 && value.is_finite() => {
                (value * scale).round() / scale
            }
            PrecisionModel::Fixed { .. } => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub precision: PrecisionModel,
    /// Deepest collection nesting either converter (and the EWKB reader) will follow
    pub max_depth: usize,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        ConverterConfig {
            precision: PrecisionModel::Floating,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
