//! Disk-shaped erosion brush.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::error::ConfigError;

/// Largest number of cells a brush may cover.
pub const MAX_BRUSH_CELLS: usize = 500;

/// One cell of the brush, relative to the droplet's cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushCell {
    pub dx: i32,
    pub dy: i32,
    /// Linear index delta `dy * stride + dx`.
    pub offset: isize,
    pub weight: f32,
}

/// Weighted disk kernel spreading one erosion step over nearby cells.
///
/// Holds every lattice point strictly inside the disk of `radius`, weighted by
/// `1 - distance / radius` and normalized to sum to one.
#[derive(Debug, Clone, PartialEq)]
pub struct ErosionBrush {
    radius: u32,
    stride: usize,
    cells: Vec<BrushCell>,
}

/// Number of lattice points `(dx, dy)` with `dx² + dy² < radius²`.
///
/// Counted row by row, one row per unit of radius. Saturates at `usize::MAX`.
pub fn brush_cell_count(radius: u32) -> usize {
    brush_cell_count_capped(radius, usize::MAX)
}

/// Like [`brush_cell_count`], but stops as soon as the running total passes
/// `limit`.
///
/// The result is exact when it is at most `limit`. Otherwise it is the first
/// partial total above `limit`, a lower bound on the real count.
pub fn brush_cell_count_capped(radius: u32, limit: usize) -> usize {
    if radius == 0 {
        return 0;
    }
    let r = radius as u64;
    let r_sq = r * r;
    let mut count = 0usize;
    for dy in 0..r {
        let half_width = isqrt(r_sq - dy * dy - 1);
        let row = 2 * half_width + 1;
        let cells = if dy == 0 { row } else { 2 * row };
        count = count.saturating_add(usize::try_from(cells).unwrap_or(usize::MAX));
        if count > limit {
            break;
        }
    }
    count
}

/// Largest `d` with `d * d <= value`.
fn isqrt(value: u64) -> u64 {
    let value = value as u128;
    let mut d = (value as f64).sqrt() as u128;
    while d * d > value {
        d -= 1;
    }
    while (d + 1) * (d + 1) <= value {
        d += 1;
    }
    d as u64
}

impl ErosionBrush {
    /// Builds the brush for a grid whose rows are `stride` cells long.
    ///
    /// # Errors
    /// [`ConfigError::InvalidBrushRadius`] for a zero radius and
    /// [`ConfigError::BrushTooLarge`] when the disk covers more than
    /// [`MAX_BRUSH_CELLS`] cells. Counting stops at the first row past the
    /// ceiling, so the reported count is a lower bound for huge radii.
    pub fn build(radius: u32, stride: usize) -> Result<Self, ConfigError> {
        if radius == 0 {
            return Err(ConfigError::InvalidBrushRadius(radius));
        }
        let count = brush_cell_count_capped(radius, MAX_BRUSH_CELLS);
        if count > MAX_BRUSH_CELLS {
            return Err(ConfigError::BrushTooLarge {
                radius,
                cells: count,
                limit: MAX_BRUSH_CELLS,
            });
        }

        let r = radius as i32;
        let mut cells = Vec::with_capacity(count);
        let mut weight_sum = 0.0f32;
        for dy in -r..=r {
            for dx in -r..=r {
                let sq_dst = dx * dx + dy * dy;
                if sq_dst < r * r {
                    let weight = 1.0 - (sq_dst as f32).sqrt() / radius as f32;
                    weight_sum += weight;
                    cells.push(BrushCell {
                        dx,
                        dy,
                        offset: dy as isize * stride as isize + dx as isize,
                        weight,
                    });
                }
            }
        }
        for cell in &mut cells {
            cell.weight /= weight_sum;
        }

        debug!("Built erosion brush: radius {}, {} cells", radius, cells.len());
        Ok(Self { radius, stride, cells })
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Row stride the linear offsets were computed for.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn cells(&self) -> &[BrushCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn weight_sum(&self) -> f32 {
        self.cells.iter().map(|c| c.weight).sum()
    }
}

/// Brushes keyed by `(radius, stride)`, shared across erosion passes.
#[derive(Debug, Default)]
pub struct BrushCache {
    brushes: HashMap<(u32, usize), Arc<ErosionBrush>>,
}

impl BrushCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached brush, building it on first use. Failed builds are
    /// not cached.
    pub fn get_or_build(&mut self, radius: u32, stride: usize) -> Result<Arc<ErosionBrush>, ConfigError> {
        if let Some(brush) = self.brushes.get(&(radius, stride)) {
            return Ok(Arc::clone(brush));
        }
        let brush = Arc::new(ErosionBrush::build(radius, stride)?);
        self.brushes.insert((radius, stride), Arc::clone(&brush));
        Ok(brush)
    }

    pub fn len(&self) -> usize {
        self.brushes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brushes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn brute_force_count(radius: u32) -> usize {
        let r = radius as i64;
        let mut count = 0;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy < r * r {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn test_radius_one_is_single_cell() {
        let brush = ErosionBrush::build(1, 10).unwrap();
        assert_eq!(brush.len(), 1);
        assert_eq!(brush.cells()[0].offset, 0);
        assert_eq!(brush.cells()[0].weight, 1.0);
    }

    #[test]
    fn test_known_cell_counts() {
        assert_eq!(ErosionBrush::build(2, 16).unwrap().len(), 9);
        assert_eq!(ErosionBrush::build(3, 16).unwrap().len(), 25);
        assert_eq!(ErosionBrush::build(12, 64).unwrap().len(), 437);
    }

    #[test]
    fn test_center_has_largest_weight() {
        let brush = ErosionBrush::build(4, 32).unwrap();
        let center = brush.cells().iter().find(|c| c.dx == 0 && c.dy == 0).unwrap();
        assert!(brush.cells().iter().all(|c| c.weight <= center.weight));
    }

    #[test]
    fn test_zero_radius_fails() {
        assert_eq!(ErosionBrush::build(0, 8), Err(ConfigError::InvalidBrushRadius(0)));
    }

    #[test]
    fn test_radius_thirteen_exceeds_ceiling() {
        assert_eq!(
            ErosionBrush::build(13, 64),
            Err(ConfigError::BrushTooLarge { radius: 13, cells: 517, limit: MAX_BRUSH_CELLS })
        );
    }

    #[test]
    fn test_huge_radius_fails_fast() {
        let err = ErosionBrush::build(500, 5).unwrap_err();
        match err {
            ConfigError::BrushTooLarge { radius, cells, limit } => {
                assert_eq!(radius, 500);
                assert!(cells > limit);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_max_radius_rejected_without_counting_every_row() {
        let start = std::time::Instant::now();
        let err = ErosionBrush::build(u32::MAX, 64).unwrap_err();
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
        match err {
            ConfigError::BrushTooLarge { radius, cells, limit } => {
                assert_eq!(radius, u32::MAX);
                assert!(cells > limit);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_capped_count_is_exact_below_limit() {
        assert_eq!(brush_cell_count_capped(12, MAX_BRUSH_CELLS), 437);
        assert_eq!(brush_cell_count_capped(13, MAX_BRUSH_CELLS), 517);
        assert_eq!(brush_cell_count_capped(100_000_000, MAX_BRUSH_CELLS), 199_999_999);
    }

    #[test]
    fn test_large_count_does_not_overflow() {
        let count = brush_cell_count(100_000) as f64;
        let area = std::f64::consts::PI * 1e10;
        assert!((count - area).abs() / area < 1e-3);
    }

    #[test]
    fn test_cache_reuses_brush() {
        let mut cache = BrushCache::new();
        let a = cache.get_or_build(3, 20).unwrap();
        let b = cache.get_or_build(3, 20).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let c = cache.get_or_build(3, 21).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_does_not_store_failures() {
        let mut cache = BrushCache::new();
        assert!(cache.get_or_build(40, 100).is_err());
        assert!(cache.is_empty());
    }

    proptest! {
        #[test]
        fn prop_weights_sum_to_one(radius in 1u32..=12, stride in 25usize..300) {
            let brush = ErosionBrush::build(radius, stride).unwrap();
            prop_assert!((brush.weight_sum() - 1.0).abs() < 1e-5);
        }

        #[test]
        fn prop_cells_lie_strictly_inside_disk(radius in 1u32..=12, stride in 25usize..300) {
            let brush = ErosionBrush::build(radius, stride).unwrap();
            let r = radius as i32;
            for cell in brush.cells() {
                prop_assert!(cell.dx * cell.dx + cell.dy * cell.dy < r * r);
                prop_assert_eq!(cell.offset, cell.dy as isize * stride as isize + cell.dx as isize);
                prop_assert!(cell.weight > 0.0);
            }
        }

        #[test]
        fn prop_cell_count_matches_lattice(radius in 1u32..=60) {
            prop_assert_eq!(brush_cell_count(radius), brute_force_count(radius));
        }
    }
}
