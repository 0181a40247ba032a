//! Configuration errors shared by every stage of heightfield synthesis and erosion.

use thiserror::Error;

/// Invalid input detected before any work starts.
///
/// Every variant carries the offending value so callers can report which
/// parameter to fix. Operations that return this error never leave a
/// partially-modified heightfield behind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Map size must be positive, got {0}")]
    InvalidMapSize(u32),
    #[error("Octave count must be positive, got {0}")]
    InvalidOctaveCount(u32),
    #[error("Erosion brush radius must be at least 1, got {0}")]
    InvalidBrushRadius(u32),
    #[error("Erosion brush of radius {radius} covers at least {cells} cells, limit is {limit}")]
    BrushTooLarge { radius: u32, cells: usize, limit: usize },
    #[error("Border of {border} cells is too small, at least {required} required")]
    BorderTooSmall { border: u32, required: u32 },
    #[error("Parameter '{name}' = {value} is invalid: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f32,
        reason: &'static str,
    },
    #[error("Brush built for row stride {brush} cannot be applied to a grid of side {grid}")]
    StrideMismatch { brush: usize, grid: usize },
    #[error("Expected a {expected}x{expected} grid, got {width}x{height}")]
    DimensionMismatch { expected: u32, width: u32, height: u32 },
    #[error("Expected {expected} height samples, got {actual}")]
    SampleCountMismatch { expected: usize, actual: usize },
    #[error("Droplet batch size must be positive")]
    InvalidBatchSize,
}

impl ConfigError {
    /// Checks that a float parameter is finite and within `[min, max]`.
    pub(crate) fn check_range(
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    ) -> Result<(), ConfigError> {
        if !value.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name,
                value,
                reason: "must be finite",
            });
        }
        if value < min || value > max {
            return Err(ConfigError::InvalidParameter {
                name,
                value,
                reason: "out of range",
            });
        }
        Ok(())
    }

    /// Checks that a float parameter is finite and non-negative.
    pub(crate) fn check_non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
        Self::check_range(name, value, 0.0, f32::MAX)
    }
}
