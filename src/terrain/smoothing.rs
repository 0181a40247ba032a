//! Separable box blur used to soften raw noise before erosion.

use rayon::prelude::*;

use super::heightfield::Heightfield;

/// Blurs the whole bordered grid with a `(2 * radius + 1)` box kernel.
///
/// Samples past the grid edge are clamped to the edge cell, so a constant
/// field is left unchanged. Each pass runs a horizontal then a vertical sweep.
pub fn box_blur(field: &mut Heightfield, radius: u32, passes: u32) {
    if radius == 0 {
        return;
    }
    let side = field.side();
    let r = radius as isize;
    let mut scratch = vec![0.0f32; side * side];

    for _ in 0..passes {
        {
            let src = field.heights();
            scratch.par_chunks_mut(side).enumerate().for_each(|(y, row)| {
                let src_row = &src[y * side..(y + 1) * side];
                for (x, out) in row.iter_mut().enumerate() {
                    *out = window_mean(r, side, x, |i| src_row[i]);
                }
            });
        }

        let src = &scratch;
        field
            .heights_mut()
            .par_chunks_mut(side)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    *out = window_mean(r, side, y, |i| src[i * side + x]);
                }
            });
    }
}

#[inline]
fn window_mean(radius: isize, len: usize, center: usize, sample: impl Fn(usize) -> f32) -> f32 {
    let last = len as isize - 1;
    let mut sum = 0.0f32;
    for d in -radius..=radius {
        let i = (center as isize + d).clamp(0, last) as usize;
        sum += sample(i);
    }
    sum / (2 * radius + 1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_field_unchanged() {
        let mut field = Heightfield::filled(6, 2, 0.25).unwrap();
        box_blur(&mut field, 2, 3);
        assert!(field.heights().iter().all(|&h| (h - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_spike_is_spread() {
        let mut field = Heightfield::filled(5, 0, 0.0).unwrap();
        field.set(2, 2, 9.0);
        box_blur(&mut field, 1, 1);

        assert!((field.get(2, 2) - 1.0).abs() < 1e-6);
        assert!((field.get(1, 1) - 1.0).abs() < 1e-6);
        assert_eq!(field.get(0, 0), 0.0);
        let total: f32 = field.heights().iter().sum();
        assert!((total - 9.0).abs() < 1e-4, "interior spike mass is preserved");
    }

    #[test]
    fn test_zero_radius_is_noop() {
        let mut field = Heightfield::filled(3, 1, 0.0).unwrap();
        field.set(2, 2, 1.0);
        let before = field.clone();
        box_blur(&mut field, 0, 4);
        assert_eq!(field, before);
    }
}
