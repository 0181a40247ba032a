//! Procedural terrain heightfields with particle-based hydraulic erosion.
//!
//! The crate generates a seeded fractal-noise heightfield, surrounds it with a
//! border margin, and erodes it by simulating many independent water droplets
//! in parallel. Heightfields convert losslessly to and from `image` buffers at
//! the export boundary.

pub mod erosion;
pub mod error;
pub mod export;
pub mod noise;
pub mod pipeline;
pub mod terrain;

pub use erosion::{erode, AccumulationStrategy, DropletParams, ErosionBrush, ErosionConfig, ErosionStats, Eroder};
pub use error::ConfigError;
pub use noise::FractalNoiseConfig;
pub use pipeline::{ErosionStage, GenerationStage, HeightmapStage, Pipeline, SmoothingStage, StageConfig};
pub use terrain::{generate_heightmap, GridGeometry, Heightfield, NoiseField, Terrain};
