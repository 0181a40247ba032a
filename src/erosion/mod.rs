//! Particle-based hydraulic erosion.
//!
//! Droplets spawn on random interior cells, run downhill, and move sediment
//! between cells through a disk-shaped brush. Droplets run in parallel; writes
//! into the shared grid are accumulated either atomically or through a
//! per-batch merge (see [`AccumulationStrategy`]).

mod brush;
mod config;
mod droplet;
mod grid;
mod simulator;

pub use brush::{brush_cell_count, brush_cell_count_capped, BrushCache, BrushCell, ErosionBrush, MAX_BRUSH_CELLS};
pub use config::{AccumulationStrategy, DropletParams, ErosionConfig};
pub use droplet::{sample_height, simulate_droplet, Droplet, DropletTrace, HeightSample, Termination, MIN_WATER};
pub use grid::{AtomicHeightGrid, HeightAccess, SnapshotOverlay};
pub use simulator::{droplet_rng, erode, erode_with_brush, spawn_cells, Eroder, ErosionStats};
