//! Bordered square heightfield stored as one flat row-major buffer.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Placement of the interior region inside a bordered grid.
///
/// The grid has `side = map_size + 2 * border` cells per row. Droplets live in
/// the interior `[border, border + map_size)` on both axes; the margin keeps
/// bilinear sampling and brush writes inside the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridGeometry {
    pub map_size: u32,
    pub border: u32,
}

impl GridGeometry {
    pub fn new(map_size: u32, border: u32) -> Result<Self, ConfigError> {
        if map_size == 0 {
            return Err(ConfigError::InvalidMapSize(map_size));
        }
        Ok(Self { map_size, border })
    }

    /// Cells per row, including both margins.
    #[inline]
    pub fn side(&self) -> usize {
        self.map_size as usize + 2 * self.border as usize
    }

    /// Total number of cells in the bordered grid.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.side() * self.side()
    }

    /// Row-major index of cell `(x, y)`.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.side() && y < self.side());
        y * self.side() + x
    }

    /// True if the cell lies anywhere inside the bordered grid.
    #[inline]
    pub fn contains_cell(&self, x: i64, y: i64) -> bool {
        let side = self.side() as i64;
        x >= 0 && y >= 0 && x < side && y < side
    }

    /// True if a continuous position lies in the interior region.
    #[inline]
    pub fn interior_contains(&self, position: Vec2) -> bool {
        let lo = self.border as f32;
        let hi = (self.border + self.map_size) as f32;
        position.x >= lo && position.x < hi && position.y >= lo && position.y < hi
    }
}

/// Square grid of elevations with a padding border, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heightfield {
    geometry: GridGeometry,
    heights: Vec<f32>,
}

impl Heightfield {
    /// Creates a heightfield with every cell set to `value`.
    pub fn filled(map_size: u32, border: u32, value: f32) -> Result<Self, ConfigError> {
        let geometry = GridGeometry::new(map_size, border)?;
        Ok(Self {
            geometry,
            heights: vec![value; geometry.cell_count()],
        })
    }

    /// Wraps an existing bordered buffer of `side * side` values.
    pub fn from_heights(map_size: u32, border: u32, heights: Vec<f32>) -> Result<Self, ConfigError> {
        let geometry = GridGeometry::new(map_size, border)?;
        if heights.len() != geometry.cell_count() {
            return Err(ConfigError::SampleCountMismatch {
                expected: geometry.cell_count(),
                actual: heights.len(),
            });
        }
        Ok(Self { geometry, heights })
    }

    /// Embeds a `map_size * map_size` interior into a bordered grid.
    ///
    /// Margin cells replicate the nearest interior edge value, so the terrain
    /// continues flat across the border instead of dropping to zero.
    pub fn from_interior(map_size: u32, border: u32, interior: &[f32]) -> Result<Self, ConfigError> {
        let geometry = GridGeometry::new(map_size, border)?;
        let m = map_size as usize;
        if interior.len() != m * m {
            return Err(ConfigError::SampleCountMismatch {
                expected: m * m,
                actual: interior.len(),
            });
        }

        let side = geometry.side();
        let b = border as usize;
        let mut heights = vec![0.0f32; geometry.cell_count()];
        for (y, row) in heights.chunks_mut(side).enumerate() {
            let sy = y.saturating_sub(b).min(m - 1);
            for (x, height) in row.iter_mut().enumerate() {
                let sx = x.saturating_sub(b).min(m - 1);
                *height = interior[sy * m + sx];
            }
        }

        Ok(Self { geometry, heights })
    }

    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    pub fn map_size(&self) -> u32 {
        self.geometry.map_size
    }

    pub fn border(&self) -> u32 {
        self.geometry.border
    }

    pub fn side(&self) -> usize {
        self.geometry.side()
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn heights_mut(&mut self) -> &mut [f32] {
        &mut self.heights
    }

    pub fn into_heights(self) -> Vec<f32> {
        self.heights
    }

    /// Returns the height at the given cell.
    ///
    /// # Panics
    /// Panics if x or y is out of bounds.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.heights[self.geometry.index(x, y)]
    }

    /// Sets the height at the given cell.
    ///
    /// # Panics
    /// Panics if x or y is out of bounds.
    pub fn set(&mut self, x: usize, y: usize, height: f32) {
        let index = self.geometry.index(x, y);
        self.heights[index] = height;
    }

    /// Copies out the interior region, row-major, without the border.
    pub fn interior(&self) -> Vec<f32> {
        let b = self.border() as usize;
        let m = self.map_size() as usize;
        let side = self.side();
        let mut out = Vec::with_capacity(m * m);
        for y in b..b + m {
            out.extend_from_slice(&self.heights[y * side + b..y * side + b + m]);
        }
        out
    }

    /// Computes (min, max) over the interior region.
    pub fn interior_range(&self) -> (f32, f32) {
        super::heightmap::height_range(&self.interior())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_side_and_index() {
        let geometry = GridGeometry::new(4, 1).unwrap();
        assert_eq!(geometry.side(), 6);
        assert_eq!(geometry.cell_count(), 36);
        assert_eq!(geometry.index(0, 0), 0);
        assert_eq!(geometry.index(5, 0), 5);
        assert_eq!(geometry.index(0, 1), 6);
        assert_eq!(geometry.index(5, 5), 35);
    }

    #[test]
    fn test_geometry_rejects_zero_map_size() {
        assert_eq!(GridGeometry::new(0, 3), Err(ConfigError::InvalidMapSize(0)));
    }

    #[test]
    fn test_interior_contains_is_half_open() {
        let geometry = GridGeometry::new(4, 2).unwrap();
        assert!(geometry.interior_contains(Vec2::new(2.0, 2.0)));
        assert!(geometry.interior_contains(Vec2::new(5.99, 5.99)));
        assert!(!geometry.interior_contains(Vec2::new(6.0, 3.0)));
        assert!(!geometry.interior_contains(Vec2::new(3.0, 1.99)));
    }

    #[test]
    fn test_contains_cell() {
        let geometry = GridGeometry::new(2, 1).unwrap();
        assert!(geometry.contains_cell(0, 0));
        assert!(geometry.contains_cell(3, 3));
        assert!(!geometry.contains_cell(-1, 0));
        assert!(!geometry.contains_cell(4, 0));
    }

    #[test]
    fn test_from_interior_replicates_edges() {
        let interior = vec![1.0, 2.0, 3.0, 4.0];
        let field = Heightfield::from_interior(2, 1, &interior).unwrap();
        assert_eq!(field.side(), 4);
        #[rustfmt::skip]
        let expected = vec![
            1.0, 1.0, 2.0, 2.0,
            1.0, 1.0, 2.0, 2.0,
            3.0, 3.0, 4.0, 4.0,
            3.0, 3.0, 4.0, 4.0,
        ];
        assert_eq!(field.heights(), &expected[..]);
        assert_eq!(field.interior(), interior);
    }

    #[test]
    fn test_from_interior_rejects_wrong_length() {
        assert!(Heightfield::from_interior(3, 1, &[0.0; 8]).is_err());
    }

    #[test]
    fn test_from_heights_rejects_wrong_length() {
        assert!(Heightfield::from_heights(2, 1, vec![0.0; 15]).is_err());
        assert!(Heightfield::from_heights(2, 1, vec![0.0; 16]).is_ok());
    }

    #[test]
    fn test_get_set() {
        let mut field = Heightfield::filled(4, 2, 0.0).unwrap();
        field.set(3, 5, 0.5);
        assert_eq!(field.get(3, 5), 0.5);
        assert_eq!(field.heights()[5 * 8 + 3], 0.5);
    }

    #[test]
    fn test_interior_range_ignores_border() {
        let mut field = Heightfield::filled(2, 1, 0.5).unwrap();
        field.set(0, 0, -10.0);
        field.set(1, 1, 0.25);
        field.set(2, 2, 0.75);
        assert_eq!(field.interior_range(), (0.25, 0.75));
    }
}
