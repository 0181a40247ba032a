//! Conversion between `image` buffers and [`Heightfield`].
//!
//! Renderers and file codecs work with [`HeightImage`]; the erosion simulator
//! works on the flat heightfield buffer. Both use the same row-major layout,
//! so packing and unpacking are plain copies and round-trip bit for bit.

use std::path::Path;

use image::{ImageBuffer, Luma};

use super::ExportError;
use crate::erosion::{erode, ErosionConfig, ErosionStats};
use crate::error::ConfigError;
use crate::terrain::Heightfield;

/// Single-channel float image covering the whole bordered grid.
pub type HeightImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Packs a square image into a heightfield with a `border` margin.
///
/// The image must include the margin, so its side is `map_size + 2 * border`.
pub fn to_buffer(image: &HeightImage, border: u32) -> Result<Heightfield, ConfigError> {
    let (width, height) = image.dimensions();
    if width != height {
        return Err(ConfigError::DimensionMismatch {
            expected: width,
            width,
            height,
        });
    }
    let map_size = width.saturating_sub(border.saturating_mul(2));
    Heightfield::from_heights(map_size, border, image.as_raw().clone())
}

/// Unpacks a heightfield into an existing image of the same side.
pub fn to_image(field: &Heightfield, image: &mut HeightImage) -> Result<(), ConfigError> {
    let side = field.side() as u32;
    let (width, height) = image.dimensions();
    if width != side || height != side {
        return Err(ConfigError::DimensionMismatch {
            expected: side,
            width,
            height,
        });
    }
    image.copy_from_slice(field.heights());
    Ok(())
}

/// Allocates an image holding a copy of the whole bordered grid.
pub fn new_image(field: &Heightfield) -> HeightImage {
    let side = field.side() as u32;
    ImageBuffer::from_fn(side, side, |x, y| Luma([field.get(x as usize, y as usize)]))
}

/// Erodes an image in place: pack, simulate, unpack.
///
/// Nothing is written back unless the whole pass succeeds.
pub fn erode_image(
    image: &mut HeightImage,
    border: u32,
    config: &ErosionConfig,
) -> Result<ErosionStats, ConfigError> {
    let mut field = to_buffer(image, border)?;
    let stats = erode(&mut field, config)?;
    to_image(&field, image)?;
    Ok(stats)
}

/// Loads a square grayscale image file as the interior of a new heightfield.
///
/// Pixel values are mapped to `[0, 1]` and the margin replicates the edges.
pub fn load_heightfield(path: &Path, border: u32) -> Result<Heightfield, ExportError> {
    let image = image::open(path)?.to_luma32f();
    let (width, height) = image.dimensions();
    if width != height {
        return Err(ConfigError::DimensionMismatch {
            expected: width,
            width,
            height,
        }
        .into());
    }
    Ok(Heightfield::from_interior(width, border, image.as_raw())?)
}
