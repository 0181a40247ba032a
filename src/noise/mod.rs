//! Noise generation module for terrain synthesis.
//!
//! Uses simdnoise for the gradient noise basis and a seeded ChaCha stream
//! for per-octave offsets.

mod fractal;

pub use fractal::{octave_offsets, sample_fractal_noise, FractalNoiseConfig, OFFSET_RANGE};
