//! Terrain document passed between generation stages.

use serde::{Deserialize, Serialize};

use super::heightfield::Heightfield;
use crate::erosion::ErosionStats;
use crate::error::ConfigError;

/// A square terrain: the bordered heightfield plus what the stages recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Terrain {
    /// Elevations, including the border margin reserved for erosion.
    pub heightfield: Heightfield,
    /// Raw noise range before any normalization (populated after heightmap stage).
    pub noise_range: Option<(f32, f32)>,
    /// True if heights were rescaled to [0, 1] after generation.
    pub normalized: bool,
    /// Erosion totals (populated after erosion stage).
    pub erosion: Option<ErosionStats>,
}

impl Terrain {
    /// Creates a flat terrain with a `map_size` interior and a `border` margin.
    ///
    /// The border should match the erosion brush radius that will run on it.
    pub fn new(map_size: u32, border: u32) -> Result<Self, ConfigError> {
        Ok(Self {
            heightfield: Heightfield::filled(map_size, border, 0.0)?,
            noise_range: None,
            normalized: false,
            erosion: None,
        })
    }

    pub fn map_size(&self) -> u32 {
        self.heightfield.map_size()
    }

    pub fn border(&self) -> u32 {
        self.heightfield.border()
    }

    /// Returns (min, max) height over the interior.
    pub fn height_range(&self) -> (f32, f32) {
        self.heightfield.interior_range()
    }
}
