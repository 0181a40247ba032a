//! Heightmap generation using fractal noise.

use glam::Vec2;
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::noise::{octave_offsets, sample_fractal_noise, FractalNoiseConfig};

/// Raw fractal noise over a `map_size * map_size` grid plus its value range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseField {
    pub map_size: u32,
    /// Row-major samples, unnormalized unless [`NoiseField::normalize`] was called.
    pub heights: Vec<f32>,
    pub min: f32,
    pub max: f32,
}

impl NoiseField {
    /// Rescales heights to [0, 1] using the tracked min/max.
    ///
    /// Normalization is the caller's choice; erosion works on raw values too.
    /// A constant field has no range to stretch and is mapped to all zeros.
    pub fn normalize(&mut self) {
        let range = self.max - self.min;
        if range <= 0.0 {
            warn!(
                "Noise field is constant ({}), normalizing to zero",
                self.min
            );
            self.heights.par_iter_mut().for_each(|h| *h = 0.0);
            self.min = 0.0;
            self.max = 0.0;
            return;
        }

        let min = self.min;
        self.heights
            .par_iter_mut()
            .for_each(|h| *h = ((*h - min) / range).clamp(0.0, 1.0));
        self.min = 0.0;
        self.max = 1.0;
    }
}

/// Computes (min, max) with a parallel reduction.
///
/// The combine step is `f32::min`/`f32::max`, so the result does not depend on
/// how rayon splits the slice. An empty slice yields `(f32::MAX, f32::MIN)`.
pub fn height_range(heights: &[f32]) -> (f32, f32) {
    heights
        .par_iter()
        .fold(
            || (f32::MAX, f32::MIN),
            |(lo, hi), &h| (lo.min(h), hi.max(h)),
        )
        .reduce(
            || (f32::MAX, f32::MIN),
            |(lo_a, hi_a), (lo_b, hi_b)| (lo_a.min(lo_b), hi_a.max(hi_b)),
        )
}

/// Generates a fractal noise heightmap.
///
/// Rows are evaluated in parallel; each cell `(x, y)` samples the fractal at
/// `(x, y) / map_size`. Identical arguments always produce bit-identical
/// output.
///
/// # Errors
/// Returns a [`ConfigError`] when `map_size` or the octave count is zero, or a
/// scale factor is not finite.
pub fn generate_heightmap(map_size: u32, config: &FractalNoiseConfig) -> Result<NoiseField, ConfigError> {
    if map_size == 0 {
        return Err(ConfigError::InvalidMapSize(map_size));
    }
    config.validate()?;

    let offsets = octave_offsets(config.seed, config.octaves);
    let size = map_size as usize;
    let inv_size = 1.0 / map_size as f32;

    let mut heights = vec![0.0f32; size * size];
    heights.par_chunks_mut(size).enumerate().for_each(|(y, row)| {
        for (x, height) in row.iter_mut().enumerate() {
            let point = Vec2::new(x as f32, y as f32) * inv_size;
            *height = sample_fractal_noise(point, &offsets, config);
        }
    });

    let (min, max) = height_range(&heights);
    debug!(
        "Generated {}x{} noise field (seed {}, {} octaves), range [{}, {}]",
        map_size, map_size, config.seed, config.octaves, min, max
    );

    Ok(NoiseField {
        map_size,
        heights,
        min,
        max,
    })
}
