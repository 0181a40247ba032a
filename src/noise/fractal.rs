//! Multi-octave fractal noise sampled on a plane.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use simdnoise::NoiseBuilder;

use crate::error::ConfigError;

/// Octave offsets are drawn from `[-OFFSET_RANGE, OFFSET_RANGE)` on each axis.
pub const OFFSET_RANGE: i32 = 10_000;

/// Configuration for multi-octave fractal noise generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractalNoiseConfig {
    /// Number of noise octaves.
    pub octaves: u32,
    /// Sampling scale of the first octave.
    pub initial_scale: f32,
    /// Scale multiplier per octave (typically 2.0).
    pub lacunarity: f32,
    /// Amplitude decay per octave (0.4-0.6 typical).
    pub persistence: f32,
    /// Random seed for reproducible generation.
    pub seed: u64,
}

impl Default for FractalNoiseConfig {
    fn default() -> Self {
        Self {
            octaves: 7,
            initial_scale: 2.0,
            lacunarity: 2.0,
            persistence: 0.5,
            seed: 0,
        }
    }
}

impl FractalNoiseConfig {
    /// Creates a new noise configuration with the given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Rejects octave counts of zero and non-finite scale factors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.octaves == 0 {
            return Err(ConfigError::InvalidOctaveCount(self.octaves));
        }
        ConfigError::check_range("initial_scale", self.initial_scale, f32::MIN, f32::MAX)?;
        ConfigError::check_range("lacunarity", self.lacunarity, f32::MIN, f32::MAX)?;
        ConfigError::check_range("persistence", self.persistence, f32::MIN, f32::MAX)?;
        Ok(())
    }

    /// Seed handed to the underlying gradient noise basis.
    fn basis_seed(&self) -> i32 {
        self.seed as i32
    }
}

/// Derives one sampling offset per octave from `seed`.
///
/// The generator is seeded exactly once, so identical seeds always yield
/// identical tables.
pub fn octave_offsets(seed: u64, octaves: u32) -> Vec<Vec2> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..octaves)
        .map(|_| {
            let x = rng.gen_range(-OFFSET_RANGE..OFFSET_RANGE);
            let y = rng.gen_range(-OFFSET_RANGE..OFFSET_RANGE);
            Vec2::new(x as f32, y as f32)
        })
        .collect()
}

/// Single-octave gradient noise at a point, roughly in [-1, 1].
fn gradient_noise(point: Vec2, seed: i32) -> f32 {
    NoiseBuilder::fbm_2d_offset(point.x, 1, point.y, 1)
        .with_seed(seed)
        .with_freq(1.0)
        .with_octaves(1)
        .generate()
        .0[0]
}

/// Samples fractal noise at a normalized plane coordinate.
///
/// Octave `i` is sampled at `offsets[i] + point * initial_scale * lacunarity^i`
/// and weighted by `persistence^i`. The sum is returned raw: it is not divided
/// by the total amplitude, so its range grows with the octave count.
///
/// # Arguments
/// * `point` - Cell coordinate divided by the map size
/// * `offsets` - Per-octave offsets from [`octave_offsets`]
/// * `config` - Noise configuration parameters
pub fn sample_fractal_noise(point: Vec2, offsets: &[Vec2], config: &FractalNoiseConfig) -> f32 {
    let seed = config.basis_seed();
    let mut total = 0.0f32;
    let mut scale = config.initial_scale;
    let mut weight = 1.0f32;

    for offset in offsets {
        total += gradient_noise(*offset + point * scale, seed) * weight;
        weight *= config.persistence;
        scale *= config.lacunarity;
    }

    total
}
