//! Height storage that droplets read from and accumulate into.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Read and accumulate access to a flat heightfield buffer.
///
/// Droplets never overwrite a cell; they only add signed deltas, which is what
/// lets concurrent droplets share a grid without losing updates.
pub trait HeightAccess {
    fn height(&self, index: usize) -> f32;
    fn add(&mut self, index: usize, delta: f32);
}

impl HeightAccess for [f32] {
    #[inline]
    fn height(&self, index: usize) -> f32 {
        self[index]
    }

    #[inline]
    fn add(&mut self, index: usize, delta: f32) {
        self[index] += delta;
    }
}

/// Heightfield cells stored as `f32` bit patterns in `AtomicU32`s.
///
/// Additions use a compare-exchange loop, so every delta lands exactly once no
/// matter how many threads hit the same cell.
#[derive(Debug, Default)]
pub struct AtomicHeightGrid {
    cells: Vec<AtomicU32>,
}

impl AtomicHeightGrid {
    pub fn from_heights(heights: &[f32]) -> Self {
        Self {
            cells: heights.iter().map(|h| AtomicU32::new(h.to_bits())).collect(),
        }
    }

    /// Overwrites the grid with `heights`, reallocating only if the length changed.
    pub fn load_from(&mut self, heights: &[f32]) {
        if self.cells.len() != heights.len() {
            *self = Self::from_heights(heights);
            return;
        }
        for (cell, h) in self.cells.iter_mut().zip(heights) {
            *cell.get_mut() = h.to_bits();
        }
    }

    /// Copies the current values into `out`.
    ///
    /// # Panics
    /// Panics if `out` has a different length.
    pub fn store_into(&self, out: &mut [f32]) {
        assert_eq!(out.len(), self.cells.len());
        for (h, cell) in out.iter_mut().zip(&self.cells) {
            *h = f32::from_bits(cell.load(Ordering::Relaxed));
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn load(&self, index: usize) -> f32 {
        f32::from_bits(self.cells[index].load(Ordering::Relaxed))
    }

    #[inline]
    pub fn fetch_add(&self, index: usize, delta: f32) {
        let cell = &self.cells[index];
        let mut current = cell.load(Ordering::Relaxed);
        loop {
            let next = (f32::from_bits(current) + delta).to_bits();
            match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }
}

impl HeightAccess for &AtomicHeightGrid {
    #[inline]
    fn height(&self, index: usize) -> f32 {
        self.load(index)
    }

    #[inline]
    fn add(&mut self, index: usize, delta: f32) {
        self.fetch_add(index, delta);
    }
}

/// A read-only snapshot plus one droplet's own pending deltas.
///
/// The droplet sees its own erosion and deposition immediately; other
/// droplets of the same batch only see it after the merge.
#[derive(Debug)]
pub struct SnapshotOverlay<'a> {
    base: &'a [f32],
    deltas: HashMap<usize, f32>,
}

impl<'a> SnapshotOverlay<'a> {
    pub fn new(base: &'a [f32]) -> Self {
        Self {
            base,
            deltas: HashMap::new(),
        }
    }

    /// Sum of all pending deltas.
    pub fn net_change(&self) -> f32 {
        self.deltas.values().sum()
    }

    /// Pending `(index, delta)` pairs, one per touched cell.
    pub fn into_deltas(self) -> Vec<(usize, f32)> {
        self.deltas.into_iter().collect()
    }
}

impl HeightAccess for SnapshotOverlay<'_> {
    #[inline]
    fn height(&self, index: usize) -> f32 {
        self.base[index] + self.deltas.get(&index).copied().unwrap_or(0.0)
    }

    #[inline]
    fn add(&mut self, index: usize, delta: f32) {
        *self.deltas.entry(index).or_insert(0.0) += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_atomic_round_trip() {
        let heights = vec![0.5, -1.25, 3.0];
        let grid = AtomicHeightGrid::from_heights(&heights);
        let mut out = vec![0.0; 3];
        grid.store_into(&mut out);
        assert_eq!(out, heights);
    }

    #[test]
    fn test_concurrent_adds_are_not_lost() {
        let grid = AtomicHeightGrid::from_heights(&[0.0, 0.0]);
        (0..10_000).into_par_iter().for_each(|i| {
            grid.fetch_add(i % 2, 1.0);
        });
        assert_eq!(grid.load(0), 5_000.0);
        assert_eq!(grid.load(1), 5_000.0);
    }

    #[test]
    fn test_load_from_reuses_storage() {
        let mut grid = AtomicHeightGrid::from_heights(&[1.0, 2.0]);
        grid.load_from(&[3.0, 4.0]);
        assert_eq!(grid.load(1), 4.0);
        grid.load_from(&[5.0]);
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.load(0), 5.0);
    }

    #[test]
    fn test_overlay_sees_own_writes_only() {
        let base = vec![1.0, 2.0, 3.0];
        let mut overlay = SnapshotOverlay::new(&base);
        overlay.add(1, 0.5);
        overlay.add(1, 0.25);
        overlay.add(2, -1.0);

        assert_eq!(overlay.height(0), 1.0);
        assert_eq!(overlay.height(1), 2.75);
        assert_eq!(overlay.height(2), 2.0);
        assert_eq!(overlay.net_change(), -0.25);
        assert_eq!(base, vec![1.0, 2.0, 3.0]);

        let mut deltas = overlay.into_deltas();
        deltas.sort_by_key(|(i, _)| *i);
        assert_eq!(deltas, vec![(1, 0.75), (2, -1.0)]);
    }

    #[test]
    fn test_slice_access() {
        let mut heights = vec![0.0f32; 4];
        let access: &mut [f32] = &mut heights;
        access.add(3, 2.0);
        assert_eq!(access.height(3), 2.0);
    }
}
