//! Terrain generation module.
//!
//! Provides the bordered heightfield, fractal heightmap generation, and the
//! Terrain document that pipeline stages transform.

mod heightfield;
mod heightmap;
mod smoothing;
mod surface;

pub use heightfield::{GridGeometry, Heightfield};
pub use heightmap::{generate_heightmap, height_range, NoiseField};
pub use smoothing::box_blur;
pub use surface::Terrain;
