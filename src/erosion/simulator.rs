//! Parallel droplet erosion over a bordered heightfield.

use std::time::{Duration, Instant};

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::brush::{BrushCache, ErosionBrush};
use super::config::{AccumulationStrategy, ErosionConfig};
use super::droplet::{simulate_droplet, DropletTrace, Termination};
use super::grid::{AtomicHeightGrid, SnapshotOverlay};
use crate::error::ConfigError;
use crate::terrain::{GridGeometry, Heightfield};

/// Totals for one erosion pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErosionStats {
    pub droplets: u32,
    pub steps: u64,
    pub eroded: f64,
    pub deposited: f64,
    pub left_interior: u32,
    pub evaporated: u32,
    pub lifetime_exhausted: u32,
    pub elapsed: Duration,
}

impl ErosionStats {
    /// Adds one droplet's trace to the totals.
    pub fn record(&mut self, trace: &DropletTrace) {
        self.droplets += 1;
        self.steps += trace.steps as u64;
        self.eroded += trace.eroded as f64;
        self.deposited += trace.deposited as f64;
        match trace.termination {
            Termination::LeftInterior => self.left_interior += 1,
            Termination::Evaporated => self.evaporated += 1,
            Termination::LifetimeExhausted => self.lifetime_exhausted += 1,
        }
    }

    /// Combines two partial totals.
    pub fn merge(mut self, other: Self) -> Self {
        self.droplets += other.droplets;
        self.steps += other.steps;
        self.eroded += other.eroded;
        self.deposited += other.deposited;
        self.left_interior += other.left_interior;
        self.evaporated += other.evaporated;
        self.lifetime_exhausted += other.lifetime_exhausted;
        self.elapsed += other.elapsed;
        self
    }

    /// Sediment still suspended in droplets when they stopped.
    pub fn suspended(&self) -> f64 {
        self.eroded - self.deposited
    }
}

/// Picks `count` uniformly random interior cells from a seeded stream.
pub fn spawn_cells(geometry: GridGeometry, seed: u64, count: u32) -> Vec<(u32, u32)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let lo = geometry.border;
    let hi = geometry.border + geometry.map_size;
    (0..count)
        .map(|_| (rng.gen_range(lo..hi), rng.gen_range(lo..hi)))
        .collect()
}

/// Independent random stream for droplet `index`.
///
/// Stream 0 is reserved for spawn cells, so redirections never correlate with
/// spawn positions.
pub fn droplet_rng(seed: u64, index: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(index + 1);
    rng
}

/// Erodes `field` with a brush built for `config.brush_radius`.
///
/// # Errors
/// Any [`ConfigError`] from validation or brush construction. The field is
/// untouched on error.
pub fn erode(field: &mut Heightfield, config: &ErosionConfig) -> Result<ErosionStats, ConfigError> {
    config.validate()?;
    let brush = ErosionBrush::build(config.brush_radius, field.side())?;
    run_pass(field, &brush, config, &mut None)
}

/// Erodes `field` with a prebuilt brush; `config.brush_radius` is ignored.
///
/// # Errors
/// [`ConfigError::StrideMismatch`] when the brush was built for another row
/// length and [`ConfigError::BorderTooSmall`] when the field has no margin for
/// bilinear sampling.
pub fn erode_with_brush(
    field: &mut Heightfield,
    brush: &ErosionBrush,
    config: &ErosionConfig,
) -> Result<ErosionStats, ConfigError> {
    config.droplet.validate()?;
    if config.batch_size == 0 {
        return Err(ConfigError::InvalidBatchSize);
    }
    run_pass(field, brush, config, &mut None)
}

/// Reusable erosion runner.
///
/// Keeps built brushes and the atomic working grid between passes, so
/// repeated erosion of same-sized fields allocates nothing new.
#[derive(Debug)]
pub struct Eroder {
    config: ErosionConfig,
    brushes: BrushCache,
    arena: Option<(GridGeometry, AtomicHeightGrid)>,
}

impl Eroder {
    pub fn new(config: ErosionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            brushes: BrushCache::new(),
            arena: None,
        })
    }

    pub fn config(&self) -> &ErosionConfig {
        &self.config
    }

    pub fn erode(&mut self, field: &mut Heightfield) -> Result<ErosionStats, ConfigError> {
        let brush = self.brushes.get_or_build(self.config.brush_radius, field.side())?;
        run_pass(field, &brush, &self.config, &mut self.arena)
    }
}

fn check_geometry(field: &Heightfield, brush: &ErosionBrush) -> Result<(), ConfigError> {
    if brush.stride() != field.side() {
        return Err(ConfigError::StrideMismatch {
            brush: brush.stride(),
            grid: field.side(),
        });
    }
    if field.border() < 1 {
        return Err(ConfigError::BorderTooSmall {
            border: field.border(),
            required: 1,
        });
    }
    Ok(())
}

fn run_pass(
    field: &mut Heightfield,
    brush: &ErosionBrush,
    config: &ErosionConfig,
    arena: &mut Option<(GridGeometry, AtomicHeightGrid)>,
) -> Result<ErosionStats, ConfigError> {
    check_geometry(field, brush)?;
    if config.iterations == 0 {
        return Ok(ErosionStats::default());
    }

    let start = Instant::now();
    let geometry = field.geometry();
    let spawns = spawn_cells(geometry, config.seed, config.iterations);
    debug!(
        "Eroding {}x{} grid: {} droplets, brush radius {} ({} cells), {:?}",
        geometry.side(),
        geometry.side(),
        spawns.len(),
        brush.radius(),
        brush.len(),
        config.strategy
    );

    let mut stats = match config.strategy {
        AccumulationStrategy::Atomic => run_atomic(field, brush, config, &spawns, arena),
        AccumulationStrategy::Deferred => run_deferred(field, brush, config, &spawns),
    };
    stats.elapsed = start.elapsed();

    info!(
        "Erosion finished in {:.2?}: {} droplets, {} steps, eroded {:.4}, deposited {:.4}",
        stats.elapsed, stats.droplets, stats.steps, stats.eroded, stats.deposited
    );
    Ok(stats)
}

fn run_atomic(
    field: &mut Heightfield,
    brush: &ErosionBrush,
    config: &ErosionConfig,
    spawns: &[(u32, u32)],
    arena: &mut Option<(GridGeometry, AtomicHeightGrid)>,
) -> ErosionStats {
    let geometry = field.geometry();
    if arena.as_ref().is_some_and(|(g, _)| *g != geometry) {
        *arena = None;
    }
    let (_, grid) = arena.get_or_insert_with(|| (geometry, AtomicHeightGrid::default()));
    grid.load_from(field.heights());
    let grid: &AtomicHeightGrid = grid;

    let stats = spawns
        .par_iter()
        .enumerate()
        .map(|(i, &spawn)| {
            let mut rng = droplet_rng(config.seed, i as u64);
            let mut access = grid;
            simulate_droplet(&mut access, geometry, brush, &config.droplet, spawn, &mut rng)
        })
        .fold(ErosionStats::default, |mut stats, trace| {
            stats.record(&trace);
            stats
        })
        .reduce(ErosionStats::default, ErosionStats::merge);

    grid.store_into(field.heights_mut());
    stats
}

fn run_deferred(
    field: &mut Heightfield,
    brush: &ErosionBrush,
    config: &ErosionConfig,
    spawns: &[(u32, u32)],
) -> ErosionStats {
    let geometry = field.geometry();
    let batch_size = config.batch_size as usize;
    let mut stats = ErosionStats::default();

    for (batch_index, batch) in spawns.chunks(batch_size).enumerate() {
        let first = batch_index * batch_size;
        let snapshot = field.heights();
        let results: Vec<(DropletTrace, Vec<(usize, f32)>)> = batch
            .par_iter()
            .enumerate()
            .map(|(i, &spawn)| {
                let mut rng = droplet_rng(config.seed, (first + i) as u64);
                let mut overlay = SnapshotOverlay::new(snapshot);
                let trace = simulate_droplet(&mut overlay, geometry, brush, &config.droplet, spawn, &mut rng);
                let mut deltas = overlay.into_deltas();
                deltas.sort_unstable_by_key(|&(index, _)| index);
                (trace, deltas)
            })
            .collect();

        let heights = field.heights_mut();
        for (trace, deltas) in &results {
            stats.record(trace);
            for &(index, delta) in deltas {
                heights[index] += delta;
            }
        }
    }

    debug!(
        "Merged {} batches of up to {} droplets",
        spawns.len().div_ceil(batch_size),
        batch_size
    );
    stats
}
