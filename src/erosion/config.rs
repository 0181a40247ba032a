//! Erosion configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How concurrent droplets write into the shared heightfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccumulationStrategy {
    /// All droplets run at once over one grid of atomic cells. Reads see other
    /// droplets' writes as they land, so results vary with thread timing.
    Atomic,
    /// Droplets run in batches against a snapshot and emit height deltas that
    /// are merged in droplet order. Results depend only on the seed.
    Deferred,
}

impl Default for AccumulationStrategy {
    fn default() -> Self {
        Self::Deferred
    }
}

/// Physical parameters of a single droplet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropletParams {
    /// Maximum number of steps a droplet takes.
    pub max_lifetime: u32,
    /// Blend between previous direction and downhill gradient (0-1).
    pub inertia: f32,
    /// Multiplier on the sediment capacity.
    pub sediment_capacity_factor: f32,
    /// Capacity floor, so droplets on flat ground still erode a little.
    pub min_sediment_capacity: f32,
    /// Fraction of excess sediment dropped per step (0-1).
    pub deposit_speed: f32,
    /// Fraction of free capacity filled per step (0-1).
    pub erode_speed: f32,
    /// Fraction of water lost per step (0-1).
    pub evaporate_speed: f32,
    pub gravity: f32,
    pub start_speed: f32,
    pub start_water: f32,
}

impl Default for DropletParams {
    fn default() -> Self {
        Self {
            max_lifetime: 30,
            inertia: 0.3,
            sediment_capacity_factor: 3.0,
            min_sediment_capacity: 0.01,
            deposit_speed: 0.3,
            erode_speed: 0.3,
            evaporate_speed: 0.01,
            gravity: 4.0,
            start_speed: 1.0,
            start_water: 1.0,
        }
    }
}

impl DropletParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range("inertia", self.inertia, 0.0, 1.0)?;
        ConfigError::check_range("deposit_speed", self.deposit_speed, 0.0, 1.0)?;
        ConfigError::check_range("erode_speed", self.erode_speed, 0.0, 1.0)?;
        ConfigError::check_range("evaporate_speed", self.evaporate_speed, 0.0, 1.0)?;
        ConfigError::check_non_negative("sediment_capacity_factor", self.sediment_capacity_factor)?;
        ConfigError::check_non_negative("min_sediment_capacity", self.min_sediment_capacity)?;
        ConfigError::check_non_negative("gravity", self.gravity)?;
        ConfigError::check_non_negative("start_speed", self.start_speed)?;
        ConfigError::check_non_negative("start_water", self.start_water)?;
        Ok(())
    }
}

/// Parameters for one hydraulic erosion pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErosionConfig {
    /// Radius of the erosion brush in cells. The heightfield border should be
    /// at least this wide.
    pub brush_radius: u32,
    /// Number of droplets to simulate.
    pub iterations: u32,
    /// Seed for droplet spawn cells and random redirection.
    pub seed: u64,
    /// How droplets write into the shared grid.
    pub strategy: AccumulationStrategy,
    /// Droplets per snapshot when using [`AccumulationStrategy::Deferred`].
    pub batch_size: u32,
    pub droplet: DropletParams,
}

impl Default for ErosionConfig {
    fn default() -> Self {
        Self {
            brush_radius: 3,
            iterations: 50_000,
            seed: 0,
            strategy: AccumulationStrategy::default(),
            batch_size: 1024,
            droplet: DropletParams::default(),
        }
    }
}

impl ErosionConfig {
    /// A short pass for previews and tests.
    pub fn quick(seed: u64) -> Self {
        Self {
            iterations: 2_000,
            seed,
            batch_size: 256,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.brush_radius == 0 {
            return Err(ConfigError::InvalidBrushRadius(self.brush_radius));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        self.droplet.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ErosionConfig::default().validate().is_ok());
        assert!(ErosionConfig::quick(1).validate().is_ok());
        assert_eq!(ErosionConfig::default().strategy, AccumulationStrategy::Deferred);
    }

    #[test]
    fn test_inertia_out_of_range() {
        let mut config = ErosionConfig::default();
        config.droplet.inertia = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "inertia", .. })
        ));
    }

    #[test]
    fn test_negative_gravity_rejected() {
        let mut config = ErosionConfig::default();
        config.droplet.gravity = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "gravity", .. })
        ));
    }

    #[test]
    fn test_zero_radius_rejected() {
        let config = ErosionConfig {
            brush_radius: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidBrushRadius(0)));
    }

    #[test]
    fn test_zero_batch_rejected() {
        let config = ErosionConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidBatchSize));
    }
}
