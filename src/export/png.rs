//! PNG export functionality for heightmaps.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageBuffer, ImageEncoder, Luma};

use super::ExportError;
use crate::terrain::Heightfield;

/// Options for PNG export.
#[derive(Debug, Clone)]
pub struct PngExportOptions {
    /// Height mapped to black.
    pub min_height: f32,
    /// Height mapped to white.
    pub max_height: f32,
    pub compression: CompressionType,
    pub filter: FilterType,
}

impl Default for PngExportOptions {
    fn default() -> Self {
        Self {
            min_height: 0.0,
            max_height: 1.0,
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
        }
    }
}

impl PngExportOptions {
    /// Creates options spanning the interior height range of `field`.
    ///
    /// A flat field gets a unit-wide range so it still exports.
    pub fn auto_range(field: &Heightfield) -> Self {
        let (min, mut max) = field.interior_range();
        if max <= min {
            max = min + 1.0;
        }
        Self {
            min_height: min,
            max_height: max,
            ..Default::default()
        }
    }
}

/// Quantizes `height` into the full `u16` range.
pub(crate) fn quantize(height: f32, min: f32, range: f32) -> u16 {
    let normalized = ((height - min) / range).clamp(0.0, 1.0);
    (normalized * 65535.0).round() as u16
}

/// Exports the interior of a heightfield as a 16-bit grayscale PNG.
///
/// The border margin is not written; the image is `map_size` pixels square.
///
/// # Arguments
/// * `field` - The heightfield to export
/// * `path` - Output file path
/// * `options` - Export options including height range for normalization
///
/// # Returns
/// `Ok(())` on success, or an error if export fails
pub fn export_heightfield_png(
    field: &Heightfield,
    path: &Path,
    options: &PngExportOptions,
) -> Result<(), ExportError> {
    let min = options.min_height;
    let max = options.max_height;
    if min >= max {
        return Err(ExportError::InvalidHeightRange(min, max));
    }

    let size = field.map_size();
    let range = max - min;
    let interior = field.interior();
    let img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_fn(size, size, |x, y| {
        Luma([quantize(interior[(y * size + x) as usize], min, range)])
    });

    let writer = BufWriter::new(File::create(path)?);
    let encoder = PngEncoder::new_with_quality(writer, options.compression, options.filter);
    let byte_slice: &[u8] = bytemuck::cast_slice(img.as_raw());
    encoder.write_image(byte_slice, size, size, image::ExtendedColorType::L16)?;

    Ok(())
}
