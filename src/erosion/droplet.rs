//! Single-droplet hydraulic erosion.
//!
//! A droplet spawns at the center of an interior cell and walks downhill one
//! cell length per step. Each step it either picks up sediment through the
//! erosion brush or drops some of what it carries on the four corners of the
//! cell it just left. The droplet never writes a cell directly; every change is
//! an additive delta passed to [`HeightAccess::add`].

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::brush::ErosionBrush;
use super::config::DropletParams;
use super::grid::HeightAccess;
use crate::terrain::GridGeometry;

/// Water volume below which a droplet is considered evaporated.
pub const MIN_WATER: f32 = 1e-4;

/// Direction length below which the flow is treated as stalled.
const MIN_DIRECTION: f32 = 1e-6;

/// Why a droplet stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Moved outside the interior region.
    LeftInterior,
    /// Water fell below [`MIN_WATER`].
    Evaporated,
    /// Used all `max_lifetime` steps.
    LifetimeExhausted,
}

/// What one droplet did over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropletTrace {
    /// Height actually removed from the grid.
    pub eroded: f32,
    /// Height added back to the grid.
    pub deposited: f32,
    /// Sediment still carried when the droplet stopped.
    pub sediment: f32,
    /// Steps that completed a move.
    pub steps: u32,
    pub termination: Termination,
}

/// Live state of a droplet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Droplet {
    pub position: Vec2,
    pub direction: Vec2,
    pub speed: f32,
    pub water: f32,
    pub sediment: f32,
    pub lifetime: u32,
}

impl Droplet {
    /// Places a fresh droplet at the center of cell `(x, y)`.
    pub fn spawn(x: u32, y: u32, params: &DropletParams) -> Self {
        Self {
            position: Vec2::new(x as f32 + 0.5, y as f32 + 0.5),
            direction: Vec2::ZERO,
            speed: params.start_speed,
            water: params.start_water,
            sediment: 0.0,
            lifetime: params.max_lifetime,
        }
    }
}

/// Bilinear sample of a grid at a continuous position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightSample {
    pub height: f32,
    pub gradient: Vec2,
    /// Index of the top-left corner cell.
    pub index: usize,
    /// Fractional offset inside the cell, each in `[0, 1)`.
    pub offset: Vec2,
}

impl HeightSample {
    /// Corner weights in `[nw, ne, sw, se]` order.
    pub fn corner_weights(&self) -> [f32; 4] {
        let Vec2 { x: u, y: v } = self.offset;
        [(1.0 - u) * (1.0 - v), u * (1.0 - v), (1.0 - u) * v, u * v]
    }

    fn corner_indices(&self, side: usize) -> [usize; 4] {
        [self.index, self.index + 1, self.index + side, self.index + side + 1]
    }
}

/// Interpolates height and gradient from the four samples around `position`.
///
/// `position` must lie at least one cell inside the right and bottom edges of
/// the grid.
pub fn sample_height<H: HeightAccess + ?Sized>(grid: &H, side: usize, position: Vec2) -> HeightSample {
    let cell = position.floor();
    let offset = position - cell;
    let index = cell.y as usize * side + cell.x as usize;

    let nw = grid.height(index);
    let ne = grid.height(index + 1);
    let sw = grid.height(index + side);
    let se = grid.height(index + side + 1);

    let Vec2 { x: u, y: v } = offset;
    let gradient = Vec2::new(
        (ne - nw) * (1.0 - v) + (se - sw) * v,
        (sw - nw) * (1.0 - u) + (se - ne) * u,
    );
    let height = nw * (1.0 - u) * (1.0 - v) + ne * u * (1.0 - v) + sw * (1.0 - u) * v + se * u * v;

    HeightSample {
        height,
        gradient,
        index,
        offset,
    }
}

/// Runs one droplet from `spawn` until it terminates.
///
/// The caller guarantees `geometry.border >= 1` and a brush built for
/// `geometry.side()`. Brush cells that would fall outside the grid are skipped,
/// and the droplet only gains the sediment that was actually removed.
pub fn simulate_droplet<H, R>(
    grid: &mut H,
    geometry: GridGeometry,
    brush: &ErosionBrush,
    params: &DropletParams,
    spawn: (u32, u32),
    rng: &mut R,
) -> DropletTrace
where
    H: HeightAccess + ?Sized,
    R: Rng,
{
    let side = geometry.side();
    let mut droplet = Droplet::spawn(spawn.0, spawn.1, params);
    let mut eroded = 0.0f32;
    let mut deposited = 0.0f32;
    let mut steps = 0u32;

    let termination = loop {
        if droplet.lifetime == 0 {
            break Termination::LifetimeExhausted;
        }
        if droplet.water < MIN_WATER {
            break Termination::Evaporated;
        }
        droplet.lifetime -= 1;

        let old = sample_height(&*grid, side, droplet.position);
        let old_cell = droplet.position.floor();

        let direction = droplet.direction * params.inertia - old.gradient * (1.0 - params.inertia);
        droplet.direction = if direction.length() < MIN_DIRECTION {
            Vec2::from_angle(rng.gen_range(0.0..TAU))
        } else {
            direction.normalize()
        };
        droplet.position += droplet.direction;

        if !geometry.interior_contains(droplet.position) {
            break Termination::LeftInterior;
        }
        steps += 1;

        let new_height = sample_height(&*grid, side, droplet.position).height;
        let delta_height = new_height - old.height;

        let capacity = (-delta_height * droplet.speed * droplet.water * params.sediment_capacity_factor)
            .max(params.min_sediment_capacity);

        if delta_height > 0.0 || droplet.sediment > capacity {
            let amount = if delta_height > 0.0 {
                delta_height.min(droplet.sediment)
            } else {
                (droplet.sediment - capacity) * params.deposit_speed
            };
            let weights = old.corner_weights();
            for (index, weight) in old.corner_indices(side).into_iter().zip(weights) {
                grid.add(index, amount * weight);
            }
            droplet.sediment -= amount;
            deposited += amount;
        } else {
            let amount = ((capacity - droplet.sediment) * params.erode_speed).min(-delta_height);
            let (cx, cy) = (old_cell.x as i64, old_cell.y as i64);
            let mut removed = 0.0f32;
            for cell in brush.cells() {
                let (x, y) = (cx + cell.dx as i64, cy + cell.dy as i64);
                if !geometry.contains_cell(x, y) {
                    continue;
                }
                let delta = amount * cell.weight;
                grid.add(y as usize * side + x as usize, -delta);
                removed += delta;
            }
            droplet.sediment += removed;
            eroded += removed;
        }

        droplet.speed = (droplet.speed * droplet.speed + delta_height * params.gravity)
            .max(0.0)
            .sqrt();
        droplet.water *= 1.0 - params.evaporate_speed;
    };

    DropletTrace {
        eroded,
        deposited,
        sediment: droplet.sediment,
        steps,
        termination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::Heightfield;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Records every index touched so tests can check bounds.
    struct Recording {
        heights: Vec<f32>,
        touched: Vec<usize>,
    }

    impl HeightAccess for Recording {
        fn height(&self, index: usize) -> f32 {
            assert!(index < self.heights.len(), "read out of bounds: {}", index);
            self.heights[index]
        }

        fn add(&mut self, index: usize, delta: f32) {
            assert!(index < self.heights.len(), "write out of bounds: {}", index);
            self.touched.push(index);
            self.heights[index] += delta;
        }
    }

    fn slope(map_size: u32, border: u32) -> Heightfield {
        let m = map_size as usize;
        let interior: Vec<f32> = (0..m * m).map(|i| (i % m) as f32 * 0.1).collect();
        Heightfield::from_interior(map_size, border, &interior).unwrap()
    }

    #[test]
    fn test_spawn_at_cell_center() {
        let droplet = Droplet::spawn(3, 7, &DropletParams::default());
        assert_eq!(droplet.position, Vec2::new(3.5, 7.5));
        assert_eq!(droplet.direction, Vec2::ZERO);
        assert_eq!(droplet.sediment, 0.0);
        assert_eq!(droplet.lifetime, 30);
    }

    #[test]
    fn test_bilinear_sample() {
        // 3x3 grid rising to the right by 1 per cell and downward by 2 per cell.
        let grid: Vec<f32> = (0..9).map(|i| (i % 3) as f32 + 2.0 * (i / 3) as f32).collect();
        let sample = sample_height(&grid[..], 3, Vec2::new(0.25, 0.5));
        assert!((sample.height - 1.25).abs() < 1e-6);
        assert!((sample.gradient - Vec2::new(1.0, 2.0)).length() < 1e-6);
        assert_eq!(sample.index, 0);
        let weights = sample.corner_weights();
        assert!((weights.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_flat_field_terminates_within_lifetime() {
        let mut field = Heightfield::filled(16, 3, 0.5).unwrap();
        let geometry = field.geometry();
        let brush = ErosionBrush::build(3, geometry.side()).unwrap();
        let params = DropletParams::default();
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        for spawn in [(3, 3), (10, 10), (18, 18)] {
            let trace = simulate_droplet(field.heights_mut(), geometry, &brush, &params, spawn, &mut rng);
            assert!(trace.steps <= params.max_lifetime, "droplet ran {} steps", trace.steps);
        }
    }

    #[test]
    fn test_droplet_erodes_downhill() {
        let mut field = slope(32, 3);
        let before = field.clone();
        let geometry = field.geometry();
        let brush = ErosionBrush::build(3, geometry.side()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let trace = simulate_droplet(
            field.heights_mut(),
            geometry,
            &brush,
            &DropletParams::default(),
            (30, 18),
            &mut rng,
        );

        assert!(trace.steps > 0);
        assert!(trace.eroded > 0.0, "droplet should erode on a slope");
        assert_ne!(field, before);
    }

    #[test]
    fn test_net_change_matches_carried_sediment() {
        let mut field = slope(24, 3);
        let geometry = field.geometry();
        let brush = ErosionBrush::build(3, geometry.side()).unwrap();
        let params = DropletParams {
            deposit_speed: 1.0,
            erode_speed: 1.0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        for spawn in [(20, 8), (12, 12), (25, 20)] {
            let before: f64 = field.heights().iter().map(|&h| h as f64).sum();
            let trace = simulate_droplet(field.heights_mut(), geometry, &brush, &params, spawn, &mut rng);
            let after: f64 = field.heights().iter().map(|&h| h as f64).sum();

            let net = after - before;
            assert!((net - (trace.deposited - trace.eroded) as f64).abs() < 1e-3);
            assert!((trace.sediment - (trace.eroded - trace.deposited)).abs() < 1e-3);
            assert!(trace.sediment >= -1e-6, "sediment went negative: {}", trace.sediment);
        }
    }

    #[test]
    fn test_never_touches_outside_grid() {
        let geometry = GridGeometry::new(8, 1).unwrap();
        let side = geometry.side();
        let heights: Vec<f32> = (0..side * side).map(|i| ((i * 7919) % 13) as f32 * 0.05).collect();
        let mut grid = Recording {
            heights,
            touched: Vec::new(),
        };
        // Radius larger than the border forces the brush to clip.
        let brush = ErosionBrush::build(4, side).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(77);

        for y in 1..9 {
            for x in 1..9 {
                simulate_droplet(&mut grid, geometry, &brush, &DropletParams::default(), (x, y), &mut rng);
            }
        }
        assert!(grid.touched.iter().all(|&i| i < side * side));
        assert!(grid.heights.iter().all(|h| h.is_finite()));
    }

    #[test]
    fn test_zero_water_evaporates_immediately() {
        let mut field = slope(8, 1);
        let geometry = field.geometry();
        let brush = ErosionBrush::build(1, geometry.side()).unwrap();
        let params = DropletParams {
            start_water: 0.0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let before = field.clone();
        let trace = simulate_droplet(field.heights_mut(), geometry, &brush, &params, (4, 4), &mut rng);
        assert_eq!(trace.termination, Termination::Evaporated);
        assert_eq!(trace.steps, 0);
        assert_eq!(field, before);
    }
}
